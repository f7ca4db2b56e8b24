use anyhow::Result;
use cadence_core::repository::{SqliteRepository, TaskRepository};
use uuid::Uuid;

use crate::cli::ListCommand;
use crate::views::table;

pub async fn list_tasks(
    repo: &SqliteRepository,
    owner_id: Uuid,
    cmd: ListCommand,
) -> Result<()> {
    let owner = if cmd.all { None } else { Some(owner_id) };
    let tasks = repo.list_tasks(owner).await?;

    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    println!("{}", table::render(&tasks));
    Ok(())
}
