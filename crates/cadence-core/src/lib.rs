//! # Cadence Core Library
//!
//! The recurring-task expansion and synchronization engine behind the
//! cadence operations dashboard.
//!
//! ## Features
//!
//! - **Rule Expansion**: a small, persisted recurrence grammar
//!   (daily / weekly with weekday sets / monthly by day-of-month, interval
//!   multipliers, inclusive end dates) expanded over rolling windows
//! - **Idempotent Reconciliation**: one pass materializes each occurrence
//!   exactly once, batched per pass, safe to trigger both periodically and
//!   on demand
//! - **Commit Lifecycle**: backlog ⇄ committed-day transitions with
//!   compensating calendar-block cleanup
//! - **Type Safety**: SQL via sqlx, recurrence side-state as a fixed struct
//!   rather than a free-form map
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`repository`]: Data access layer with Repository pattern
//! - [`rule`]: Recurrence grammar parsing, building, and expansion
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     db,
//!     models::{EngineConfig, NewTaskData},
//!     repository::{ReconcileRepository, SqliteRepository, TaskRepository},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cadence_core::error::CoreError> {
//!     let pool = db::establish_connection("cadence.db").await?;
//!     let repo = SqliteRepository::new(pool, EngineConfig::default());
//!
//!     let root = repo
//!         .add_task(NewTaskData {
//!             name: "Daily review".to_string(),
//!             recurrence_rule: Some("FREQ=DAILY".to_string()),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     let outcome = repo.reconcile_owner(root.owner_id, None, None).await?;
//!     println!("created {} instances", outcome.created);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod rule;
