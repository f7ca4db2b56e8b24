use crate::error::CoreError;
use crate::models::{CalendarBlock, CommitRequest, Task, UncommitRequest};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

#[async_trait]
impl super::CommitRepository for SqliteRepository {
    /// Moves a task from backlog to a committed calendar day: sets
    /// `committed_date = do_date = date` (defaulting to today) and optionally
    /// flags it for the external auto-scheduler. This call never assigns a
    /// time block itself; the scheduler picks up eligible tasks on its own
    /// cadence.
    async fn commit_task(&self, owner_id: Uuid, req: CommitRequest) -> Result<Task, CoreError> {
        let task_id = req
            .task_id
            .ok_or_else(|| CoreError::Validation("task id is required".to_string()))?;
        let date = req.date.unwrap_or_else(|| Utc::now().date_naive());

        let task: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(task_id)
            .bind(owner_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| CoreError::NotFound(task_id.to_string()))?;

        let auto_schedule = req.auto_schedule.unwrap_or(task.auto_schedule);

        let updated: Task = sqlx::query_as(
            r#"UPDATE tasks
            SET committed_date = $1, do_date = $1, auto_schedule = $2, updated_at = $3
            WHERE id = $4
            RETURNING *"#,
        )
        .bind(date)
        .bind(auto_schedule)
        .bind(Utc::now())
        .bind(task_id)
        .fetch_one(self.pool())
        .await?;

        Ok(updated)
    }

    /// Returns a task to the backlog: clears `committed_date`, `do_date`, and
    /// `scheduled_block_id`, then deletes the previously assigned calendar
    /// block as a compensating step. Block cleanup is advisory: if the delete
    /// fails the task update stands and the failure is only logged.
    async fn uncommit_task(
        &self,
        owner_id: Uuid,
        req: UncommitRequest,
    ) -> Result<Task, CoreError> {
        let task_id = req
            .task_id
            .ok_or_else(|| CoreError::Validation("task id is required".to_string()))?;

        let task: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(task_id)
            .bind(owner_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| CoreError::NotFound(task_id.to_string()))?;

        let block_id = task.scheduled_block_id;

        let updated: Task = sqlx::query_as(
            r#"UPDATE tasks
            SET committed_date = NULL, do_date = NULL, scheduled_block_id = NULL, updated_at = $1
            WHERE id = $2
            RETURNING *"#,
        )
        .bind(Utc::now())
        .bind(task_id)
        .fetch_one(self.pool())
        .await?;

        if let Some(block_id) = block_id {
            if let Err(err) = self.delete_block(block_id).await {
                warn!(task_id = %task_id, block_id = %block_id, %err,
                    "failed to delete calendar block during uncommit");
            }
        }

        Ok(updated)
    }

    async fn attach_block(
        &self,
        owner_id: Uuid,
        task_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<CalendarBlock, CoreError> {
        let task: Option<Task> = sqlx::query_as("SELECT * FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(task_id)
            .bind(owner_id)
            .fetch_optional(self.pool())
            .await?;
        if task.is_none() {
            return Err(CoreError::NotFound(task_id.to_string()));
        }

        let block = CalendarBlock {
            id: Uuid::now_v7(),
            owner_id,
            task_id: Some(task_id),
            starts_at,
            ends_at,
            created_at: Utc::now(),
        };

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            r#"INSERT INTO calendar_blocks (id, owner_id, task_id, starts_at, ends_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(block.id)
        .bind(block.owner_id)
        .bind(block.task_id)
        .bind(block.starts_at)
        .bind(block.ends_at)
        .bind(block.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE tasks SET scheduled_block_id = $1, updated_at = $2 WHERE id = $3")
            .bind(block.id)
            .bind(Utc::now())
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(block)
    }

    async fn delete_block(&self, id: Uuid) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM calendar_blocks WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
