use crate::error::CoreError;
use crate::models::{
    ReconcileOutcome, ReconcileScope, ReconcileWindow, SchedulingMeta, Task, TaskStatus,
};
use crate::repository::tasks::TASK_COLUMNS;
use crate::repository::SqliteRepository;
use crate::rule::expand_or_empty;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::QueryBuilder;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Rows per INSERT statement, kept well under SQLite's bind-variable limit
/// (22 binds per row). All chunks still run inside the one pass transaction.
const INSERT_CHUNK: usize = 100;

#[async_trait]
impl super::ReconcileRepository for SqliteRepository {
    async fn reconcile_all(
        &self,
        window: Option<ReconcileWindow>,
    ) -> Result<ReconcileOutcome, CoreError> {
        self.run_reconcile_pass(ReconcileScope::AllTenants, window)
            .await
    }

    async fn reconcile_owner(
        &self,
        owner_id: Uuid,
        root_id: Option<Uuid>,
        window: Option<ReconcileWindow>,
    ) -> Result<ReconcileOutcome, CoreError> {
        self.run_reconcile_pass(ReconcileScope::Owner { owner_id, root_id }, window)
            .await
    }
}

impl SqliteRepository {
    /// One reconciliation pass: load eligible roots, expand their rules over
    /// the window, dedup against already-materialized instances, and insert
    /// what is missing.
    ///
    /// # Behavior
    /// - Paused roots are counted and otherwise untouched
    /// - The membership lookup is one batched query across all candidate
    ///   roots, and inserts are batched; the pass never issues
    ///   per-occurrence round-trips
    /// - The whole pass runs in a single transaction: it either fully
    ///   succeeds with accurate counts or fails without partial effects
    /// - Inserts use OR IGNORE against the (parent, do_date) unique index,
    ///   so a concurrent pass racing on the same occurrence cannot
    ///   double-materialize; `created` reflects rows actually inserted
    ///
    /// Running the same pass twice in a row therefore yields `created = 0`
    /// the second time, with the first run's inserts showing up as `skipped`.
    pub async fn run_reconcile_pass(
        &self,
        scope: ReconcileScope,
        window: Option<ReconcileWindow>,
    ) -> Result<ReconcileOutcome, CoreError> {
        let window = window
            .unwrap_or_else(|| ReconcileWindow::from_today(self.config().lookahead_days));
        let started = std::time::Instant::now();

        let mut tx = self.pool().begin().await?;

        let roots: Vec<Task> = match &scope {
            ReconcileScope::AllTenants => {
                sqlx::query_as(
                    "SELECT * FROM tasks WHERE parent_task_id IS NULL AND recurrence_rule IS NOT NULL",
                )
                .fetch_all(&mut *tx)
                .await?
            }
            ReconcileScope::Owner { owner_id, root_id: None } => {
                sqlx::query_as(
                    "SELECT * FROM tasks WHERE parent_task_id IS NULL AND recurrence_rule IS NOT NULL AND owner_id = $1",
                )
                .bind(owner_id)
                .fetch_all(&mut *tx)
                .await?
            }
            ReconcileScope::Owner { owner_id, root_id: Some(root_id) } => {
                let roots: Vec<Task> = sqlx::query_as(
                    "SELECT * FROM tasks WHERE parent_task_id IS NULL AND recurrence_rule IS NOT NULL AND owner_id = $1 AND id = $2",
                )
                .bind(owner_id)
                .bind(root_id)
                .fetch_all(&mut *tx)
                .await?;
                if roots.is_empty() {
                    return Err(CoreError::NotFound(format!(
                        "recurring series not found: {root_id}"
                    )));
                }
                roots
            }
        };

        let mut outcome = ReconcileOutcome::default();
        let today = Utc::now().date_naive();

        let mut expansions: Vec<(usize, Vec<NaiveDate>)> = Vec::new();
        let mut candidate_ids: Vec<Uuid> = Vec::new();
        for (idx, root) in roots.iter().enumerate() {
            if root.is_paused() {
                outcome.paused_series += 1;
                continue;
            }
            let Some(rule) = root.recurrence_rule.as_deref() else {
                continue;
            };
            let anchor = match root.recurrence_anchor {
                Some(anchor) => anchor,
                None => {
                    // Legacy rows only; anchors are stamped at rule-set time
                    warn!(root_id = %root.id, "recurrence root has no stored anchor, deriving one");
                    root.due_date.or(root.do_date).unwrap_or(today)
                }
            };
            let dates = expand_or_empty(rule, anchor, window);
            if !dates.is_empty() {
                candidate_ids.push(root.id);
                expansions.push((idx, dates));
            }
        }

        // One membership query for all candidate roots. If this fails the
        // whole pass aborts; creating instances against a partial dedup view
        // is worse than creating none.
        let existing: HashSet<(Uuid, NaiveDate)> = if candidate_ids.is_empty() {
            HashSet::new()
        } else {
            let mut qb: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "SELECT parent_task_id, do_date FROM tasks WHERE do_date BETWEEN ",
            );
            qb.push_bind(window.start);
            qb.push(" AND ");
            qb.push_bind(window.end);
            qb.push(" AND parent_task_id IN (");
            let mut separated = qb.separated(", ");
            for id in &candidate_ids {
                separated.push_bind(*id);
            }
            qb.push(")");

            let rows: Vec<(Uuid, NaiveDate)> =
                qb.build_query_as().fetch_all(&mut *tx).await?;
            rows.into_iter().collect()
        };

        let now = Utc::now();
        let mut new_instances: Vec<Task> = Vec::new();
        for (idx, dates) in &expansions {
            let root = &roots[*idx];
            for occurrence in dates {
                if existing.contains(&(root.id, *occurrence)) {
                    outcome.skipped += 1;
                } else {
                    new_instances.push(instance_from_root(root, *occurrence, now));
                }
            }
        }

        for chunk in new_instances.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new(format!("INSERT OR IGNORE INTO tasks ({TASK_COLUMNS}) "));
            qb.push_values(chunk, |mut b, task| {
                b.push_bind(task.id)
                    .push_bind(task.tenant_id)
                    .push_bind(task.owner_id)
                    .push_bind(task.name.as_str())
                    .push_bind(task.description.as_deref())
                    .push_bind(task.status.clone())
                    .push_bind(task.priority.clone())
                    .push_bind(task.priority_level)
                    .push_bind(task.duration_minutes)
                    .push_bind(task.auto_schedule)
                    .push_bind(task.context.as_deref())
                    .push_bind(task.project_id)
                    .push_bind(task.recurrence_rule.as_deref())
                    .push_bind(task.recurrence_anchor)
                    .push_bind(task.parent_task_id)
                    .push_bind(task.due_date)
                    .push_bind(task.do_date)
                    .push_bind(task.committed_date)
                    .push_bind(task.scheduled_block_id)
                    .push_bind(task.scheduling_meta.clone())
                    .push_bind(task.created_at)
                    .push_bind(task.updated_at);
            });
            let result = qb.build().execute(&mut *tx).await?;
            outcome.created += result.rows_affected();
        }

        tx.commit().await?;

        info!(
            ?scope,
            window_start = %window.start,
            window_end = %window.end,
            created = outcome.created,
            skipped = outcome.skipped,
            paused_series = outcome.paused_series,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reconcile pass complete"
        );
        Ok(outcome)
    }
}

/// Builds a concrete instance for one occurrence, copying the schedulable
/// attributes from the root and stamping provenance. Instances never carry a
/// rule or anchor of their own.
fn instance_from_root(root: &Task, occurrence: NaiveDate, now: DateTime<Utc>) -> Task {
    Task {
        id: Uuid::now_v7(),
        tenant_id: root.tenant_id,
        owner_id: root.owner_id,
        name: root.name.clone(),
        description: root.description.clone(),
        status: TaskStatus::Todo,
        priority: root.priority.clone(),
        priority_level: root.priority_level,
        duration_minutes: root.duration_minutes,
        auto_schedule: root.auto_schedule,
        context: root.context.clone(),
        project_id: root.project_id,
        recurrence_rule: None,
        recurrence_anchor: None,
        parent_task_id: Some(root.id),
        due_date: Some(occurrence),
        do_date: Some(occurrence),
        committed_date: None,
        scheduled_block_id: None,
        scheduling_meta: Json(SchedulingMeta {
            recurrence_paused: false,
            recurrence_parent_id: Some(root.id),
            recurrence_generated_at: Some(now),
        }),
        created_at: now,
        updated_at: now,
    }
}
