//! Database error types for qm-db.

use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// A foreign key, NOT NULL, or UNIQUE constraint rejected a write.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The database configuration could not be used.
    #[error(transparent)]
    Config(#[from] qm_config::ConfigError),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[source] libsql::Error),
}

impl From<libsql::Error> for DatabaseError {
    fn from(e: libsql::Error) -> Self {
        if is_constraint_violation(&e) {
            Self::ConstraintViolation(e.to_string())
        } else {
            Self::LibSql(e)
        }
    }
}

/// Local failures carry the SQLite result code; extended codes such as
/// `SQLITE_CONSTRAINT_FOREIGNKEY` keep the primary code in the low byte.
/// Other variants only have a message, which reads `"<KIND> constraint failed"`.
fn is_constraint_violation(e: &libsql::Error) -> bool {
    match e {
        libsql::Error::SqliteFailure(code, _) => code & 0xff == libsql::ffi::SQLITE_CONSTRAINT,
        _ => e.to_string().contains("constraint failed"),
    }
}
