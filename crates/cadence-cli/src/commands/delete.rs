use anyhow::Result;
use cadence_core::repository::{SqliteRepository, TaskRepository};
use uuid::Uuid;

use crate::cli::DeleteCommand;

pub async fn delete_task(
    repo: &SqliteRepository,
    owner_id: Uuid,
    cmd: DeleteCommand,
) -> Result<()> {
    repo.delete_task(owner_id, cmd.id).await?;
    println!("Deleted task {}", cmd.id);
    Ok(())
}
