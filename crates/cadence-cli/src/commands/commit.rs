use anyhow::Result;
use cadence_core::models::{CommitRequest, UncommitRequest};
use cadence_core::repository::{CommitRepository, SqliteRepository};
use owo_colors::OwoColorize;
use uuid::Uuid;

use crate::cli::{CommitCommand, UncommitCommand};

pub async fn commit_task(
    repo: &SqliteRepository,
    owner_id: Uuid,
    cmd: CommitCommand,
) -> Result<()> {
    let task = repo
        .commit_task(
            owner_id,
            CommitRequest {
                task_id: Some(cmd.id),
                date: cmd.on,
                auto_schedule: cmd.auto_schedule.then_some(true),
            },
        )
        .await?;

    let day = task
        .committed_date
        .map(|d| d.to_string())
        .unwrap_or_default();
    println!("Committed {} to {}", task.name.bold(), day.green());
    if task.auto_schedule {
        println!("  eligible for auto-scheduling");
    }
    Ok(())
}

pub async fn uncommit_task(
    repo: &SqliteRepository,
    owner_id: Uuid,
    cmd: UncommitCommand,
) -> Result<()> {
    let task = repo
        .uncommit_task(owner_id, UncommitRequest { task_id: Some(cmd.id) })
        .await?;
    println!("Moved {} back to the backlog", task.name.bold());
    Ok(())
}
