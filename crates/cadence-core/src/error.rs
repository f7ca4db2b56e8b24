use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// Covers both "does not exist" and "exists but belongs to someone else";
    /// callers must not be able to tell the two apart.
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(#[from] crate::rule::RuleError),
}
