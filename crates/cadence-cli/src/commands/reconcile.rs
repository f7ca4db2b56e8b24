use anyhow::{bail, Result};
use cadence_core::models::ReconcileWindow;
use cadence_core::repository::{ReconcileRepository, SqliteRepository};
use uuid::Uuid;

use crate::cli::ReconcileCommand;

pub async fn reconcile(
    repo: &SqliteRepository,
    owner_id: Uuid,
    cmd: ReconcileCommand,
) -> Result<()> {
    let window = match (cmd.from, cmd.to) {
        (Some(from), Some(to)) => {
            if from > to {
                bail!("--from must be on or before --to");
            }
            Some(ReconcileWindow::new(from, to))
        }
        _ => None,
    };

    let outcome = if cmd.all {
        repo.reconcile_all(window).await?
    } else {
        repo.reconcile_owner(owner_id, cmd.task, window).await?
    };

    println!(
        "{} created, {} skipped, {} paused series",
        outcome.created, outcome.skipped, outcome.paused_series,
    );
    Ok(())
}
