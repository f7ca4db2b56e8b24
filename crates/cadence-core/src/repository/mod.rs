use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    CalendarBlock, CommitRequest, EngineConfig, NewTaskData, ReconcileOutcome, ReconcileWindow,
    Task, UncommitRequest,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// Re-export domain modules
pub mod commit;
pub mod reconcile;
pub mod tasks;

/// Domain-specific trait for task operations. All single-task lookups are
/// scoped by owner so a foreign task is indistinguishable from a missing one.
#[async_trait]
pub trait TaskRepository {
    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError>;
    async fn find_task(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Task>, CoreError>;
    async fn list_tasks(&self, owner_id: Option<Uuid>) -> Result<Vec<Task>, CoreError>;
    async fn delete_task(&self, owner_id: Uuid, id: Uuid) -> Result<(), CoreError>;
    /// Flips the pause flag on a recurrence root. Paused series are counted
    /// but never expanded by the reconciler.
    async fn set_series_paused(
        &self,
        owner_id: Uuid,
        id: Uuid,
        paused: bool,
    ) -> Result<Task, CoreError>;
}

/// Domain-specific trait for the reconciliation engine. Both entry points
/// run the same pass; only the root-loading scope differs.
#[async_trait]
pub trait ReconcileRepository {
    /// Periodic mode: every recurring root across all tenants.
    async fn reconcile_all(
        &self,
        window: Option<ReconcileWindow>,
    ) -> Result<ReconcileOutcome, CoreError>;

    /// On-demand mode: one owner, optionally narrowed to a single root.
    async fn reconcile_owner(
        &self,
        owner_id: Uuid,
        root_id: Option<Uuid>,
        window: Option<ReconcileWindow>,
    ) -> Result<ReconcileOutcome, CoreError>;
}

/// Domain-specific trait for the commit lifecycle and its calendar-block
/// compensations.
#[async_trait]
pub trait CommitRepository {
    async fn commit_task(&self, owner_id: Uuid, req: CommitRequest) -> Result<Task, CoreError>;
    async fn uncommit_task(&self, owner_id: Uuid, req: UncommitRequest)
        -> Result<Task, CoreError>;
    /// Records an auto-scheduler block assignment against a task.
    async fn attach_block(
        &self,
        owner_id: Uuid,
        task_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<CalendarBlock, CoreError>;
    async fn delete_block(&self, id: Uuid) -> Result<(), CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository: TaskRepository + ReconcileRepository + CommitRepository {}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
    config: EngineConfig,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, config: EngineConfig) -> Self {
        Self { pool, config }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Repository for SqliteRepository {}
