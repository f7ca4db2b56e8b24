pub mod add;
pub mod commit;
pub mod delete;
pub mod list;
pub mod reconcile;
pub mod recurrence;
