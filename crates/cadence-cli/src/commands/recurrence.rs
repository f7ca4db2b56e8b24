use anyhow::Result;
use cadence_core::repository::{SqliteRepository, TaskRepository};
use owo_colors::OwoColorize;
use uuid::Uuid;

use crate::cli::SeriesCommand;

pub async fn pause_series(
    repo: &SqliteRepository,
    owner_id: Uuid,
    cmd: SeriesCommand,
) -> Result<()> {
    let task = repo.set_series_paused(owner_id, cmd.id, true).await?;
    println!("Paused {}", task.name.bold());
    Ok(())
}

pub async fn resume_series(
    repo: &SqliteRepository,
    owner_id: Uuid,
    cmd: SeriesCommand,
) -> Result<()> {
    let task = repo.set_series_paused(owner_id, cmd.id, false).await?;
    println!(
        "Resumed {} - run {} to catch up",
        task.name.bold(),
        "cadence reconcile".cyan()
    );
    Ok(())
}
