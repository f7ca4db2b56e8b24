use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Done,
    Cancelled,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task status: {0}")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "done" => Ok(TaskStatus::Done),
            "cancelled" => Ok(TaskStatus::Cancelled),
            _ => Err(ParseTaskStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    None,
    Low,
    Medium,
    High,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task priority: {0}")]
pub struct ParseTaskPriorityError(String);

impl FromStr for TaskPriority {
    type Err = ParseTaskPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(TaskPriority::None),
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(ParseTaskPriorityError(s.to_string())),
        }
    }
}

/// Side-state attached to a task for recurrence bookkeeping.
///
/// Stored as a single JSON column but modeled as a fixed struct so every
/// recognized flag is covered at compile time. Roots use `recurrence_paused`;
/// generated instances carry the provenance fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulingMeta {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recurrence_paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_parent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_generated_at: Option<DateTime<Utc>>,
}

/// The unit of work. A task is one of three things:
///
/// - a **root**: `recurrence_rule` set, `parent_task_id` null; the template
///   for a series, never deleted by the reconciler
/// - an **instance**: `parent_task_id` set, never carries a rule of its own;
///   created only by the reconciler, at most one per (parent, do_date)
/// - an ordinary one-off: neither field set
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub priority_level: Option<i64>,
    pub duration_minutes: Option<i64>,
    pub auto_schedule: bool,
    pub context: Option<String>,
    pub project_id: Option<Uuid>,
    /// Only meaningful on roots; see [`crate::rule::Rule`] for the grammar.
    pub recurrence_rule: Option<String>,
    /// Phase reference for expansion, stamped when the rule is attached.
    pub recurrence_anchor: Option<NaiveDate>,
    pub parent_task_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub do_date: Option<NaiveDate>,
    /// "I will work this task on day X" - set only by the commit lifecycle,
    /// distinct from due-date scheduling.
    pub committed_date: Option<NaiveDate>,
    /// Link to an externally-assigned calendar block, if any.
    pub scheduled_block_id: Option<Uuid>,
    pub scheduling_meta: Json<SchedulingMeta>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// True for a series template: has a rule and no parent of its own.
    pub fn is_recurrence_root(&self) -> bool {
        self.recurrence_rule.is_some() && self.parent_task_id.is_none()
    }

    pub fn is_instance(&self) -> bool {
        self.parent_task_id.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.scheduling_meta.recurrence_paused
    }
}

impl Default for Task {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            tenant_id: Uuid::nil(),
            owner_id: Uuid::nil(),
            name: String::new(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::None,
            priority_level: None,
            duration_minutes: None,
            auto_schedule: false,
            context: None,
            project_id: None,
            recurrence_rule: None,
            recurrence_anchor: None,
            parent_task_id: None,
            due_date: None,
            do_date: None,
            committed_date: None,
            scheduled_block_id: None,
            scheduling_meta: Json(SchedulingMeta::default()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A time block on the external calendar. Created by the auto-scheduler,
/// deleted here as the compensating step of uncommit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalendarBlock {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub task_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTaskData {
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub priority_level: Option<i64>,
    pub duration_minutes: Option<i64>,
    pub auto_schedule: bool,
    pub context: Option<String>,
    pub project_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub do_date: Option<NaiveDate>,
    /// When present the task becomes a recurrence root; the rule is validated
    /// and an anchor is stamped at creation time.
    pub recurrence_rule: Option<String>,
    /// Explicit anchor override; defaults to due/do date, else today.
    pub recurrence_anchor: Option<NaiveDate>,
}

/// Request payload for the commit entry point. `task_id` is optional here so
/// missing input is rejected as a validation error before any store access.
#[derive(Debug, Clone, Default)]
pub struct CommitRequest {
    pub task_id: Option<Uuid>,
    /// Defaults to today.
    pub date: Option<NaiveDate>,
    /// When `Some(true)`, marks the task eligible for the external
    /// auto-scheduler. The scheduler itself runs on its own cadence.
    pub auto_schedule: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct UncommitRequest {
    pub task_id: Option<Uuid>,
}

/// Which series a reconciliation pass covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileScope {
    /// Periodic mode: every non-paused root across all tenants.
    AllTenants,
    /// On-demand mode: one owner, optionally narrowed to one root.
    Owner {
        owner_id: Uuid,
        root_id: Option<Uuid>,
    },
}

/// Inclusive calendar-day window for one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReconcileWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Default window: today through today + `lookahead_days`, inclusive.
    pub fn from_today(lookahead_days: u32) -> Self {
        let today = Utc::now().date_naive();
        Self {
            start: today,
            end: today + Duration::days(lookahead_days as i64),
        }
    }
}

/// Counts returned by a reconciliation pass. A pass either fully succeeds
/// with these counts or fails as a whole; it never partially commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    /// Instances actually inserted this pass.
    pub created: u64,
    /// Occurrences already materialized and left untouched.
    pub skipped: u64,
    /// Roots skipped entirely because their series is paused.
    pub paused_series: u64,
}

/// Tunables for the reconciliation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Days past today covered by the default window.
    pub lookahead_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { lookahead_days: 30 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduling_meta_roundtrips_through_json() {
        let meta = SchedulingMeta {
            recurrence_paused: true,
            recurrence_parent_id: Some(Uuid::now_v7()),
            recurrence_generated_at: Some(Utc::now()),
        };
        let json = serde_json::to_string(&meta).unwrap();
        let back: SchedulingMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
    }

    #[test]
    fn scheduling_meta_tolerates_empty_object() {
        let meta: SchedulingMeta = serde_json::from_str("{}").unwrap();
        assert!(!meta.recurrence_paused);
        assert!(meta.recurrence_parent_id.is_none());
    }

    #[test]
    fn default_window_spans_lookahead_inclusive() {
        let window = ReconcileWindow::from_today(30);
        assert_eq!((window.end - window.start).num_days(), 30);
    }

    #[test]
    fn root_and_instance_predicates() {
        let root = Task {
            recurrence_rule: Some("FREQ=DAILY".to_string()),
            ..Default::default()
        };
        assert!(root.is_recurrence_root());
        assert!(!root.is_instance());

        let instance = Task {
            parent_task_id: Some(root.id),
            ..Default::default()
        };
        assert!(!instance.is_recurrence_root());
        assert!(instance.is_instance());
    }
}
