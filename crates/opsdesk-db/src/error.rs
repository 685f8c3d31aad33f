//! Database errors

use thiserror::Error;

/// Database errors
///
/// Absent rows are `Option::None` at the repository level, not an error
/// variant: every lookup in the webhook path has a defined
/// missing-record behavior.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
