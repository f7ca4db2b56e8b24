use crate::error::CoreError;
use crate::models::{SchedulingMeta, Task, TaskPriority, TaskStatus};
use crate::repository::SqliteRepository;
use crate::rule::Rule;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::NewTaskData;

pub(crate) const TASK_COLUMNS: &str = "id, tenant_id, owner_id, name, description, status, priority, priority_level, duration_minutes, auto_schedule, context, project_id, recurrence_rule, recurrence_anchor, parent_task_id, due_date, do_date, committed_date, scheduled_block_id, scheduling_meta, created_at, updated_at";

#[async_trait]
impl super::TaskRepository for SqliteRepository {
    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError> {
        if data.name.trim().is_empty() {
            return Err(CoreError::Validation("task name is required".to_string()));
        }

        // Strict validation at write time; reconciliation stays lenient.
        // The canonical form is what gets persisted.
        let recurrence_rule = match data.recurrence_rule.as_deref() {
            Some(raw) => Some(Rule::parse(raw)?.to_string()),
            None => None,
        };

        // Roots get their phase anchor stamped once, here, so a dormant or
        // paused-then-resumed series cannot drift when it is re-expanded.
        let recurrence_anchor = if recurrence_rule.is_some() {
            Some(
                data.recurrence_anchor
                    .or(data.due_date)
                    .or(data.do_date)
                    .unwrap_or_else(|| Utc::now().date_naive()),
            )
        } else {
            None
        };

        let now = Utc::now();
        let task = Task {
            id: Uuid::now_v7(),
            tenant_id: data.tenant_id,
            owner_id: data.owner_id,
            name: data.name,
            description: data.description,
            status: TaskStatus::Todo,
            priority: data.priority.unwrap_or(TaskPriority::None),
            priority_level: data.priority_level,
            duration_minutes: data.duration_minutes,
            auto_schedule: data.auto_schedule,
            context: data.context,
            project_id: data.project_id,
            recurrence_rule,
            recurrence_anchor,
            parent_task_id: None,
            due_date: data.due_date,
            do_date: data.do_date,
            committed_date: None,
            scheduled_block_id: None,
            scheduling_meta: Json(SchedulingMeta::default()),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(&format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)"
        ))
        .bind(task.id)
        .bind(task.tenant_id)
        .bind(task.owner_id)
        .bind(&task.name)
        .bind(&task.description)
        .bind(&task.status)
        .bind(&task.priority)
        .bind(task.priority_level)
        .bind(task.duration_minutes)
        .bind(task.auto_schedule)
        .bind(&task.context)
        .bind(task.project_id)
        .bind(&task.recurrence_rule)
        .bind(task.recurrence_anchor)
        .bind(task.parent_task_id)
        .bind(task.due_date)
        .bind(task.do_date)
        .bind(task.committed_date)
        .bind(task.scheduled_block_id)
        .bind(&task.scheduling_meta)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(self.pool())
        .await?;

        Ok(task)
    }

    async fn find_task(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(task)
    }

    async fn list_tasks(&self, owner_id: Option<Uuid>) -> Result<Vec<Task>, CoreError> {
        let tasks = match owner_id {
            Some(owner) => {
                sqlx::query_as(
                    "SELECT * FROM tasks WHERE owner_id = $1 ORDER BY do_date IS NULL, do_date, created_at",
                )
                .bind(owner)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM tasks ORDER BY do_date IS NULL, do_date, created_at")
                    .fetch_all(self.pool())
                    .await?
            }
        };
        Ok(tasks)
    }

    async fn delete_task(&self, owner_id: Uuid, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_series_paused(
        &self,
        owner_id: Uuid,
        id: Uuid,
        paused: bool,
    ) -> Result<Task, CoreError> {
        let task: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        if !task.is_recurrence_root() {
            return Err(CoreError::Validation(
                "only recurrence roots can be paused or resumed".to_string(),
            ));
        }

        let mut meta = task.scheduling_meta.0.clone();
        meta.recurrence_paused = paused;

        // fetch_all, not fetch_one: the sqlite driver abandons a statement
        // once the requested row arrives, which rolls back the write before
        // the implicit transaction commits. Running to completion persists it.
        let updated: Task = sqlx::query_as(
            "UPDATE tasks SET scheduling_meta = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(Json(meta))
        .bind(Utc::now())
        .bind(id)
        .fetch_all(self.pool())
        .await?
        .pop()
        .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        Ok(updated)
    }
}
