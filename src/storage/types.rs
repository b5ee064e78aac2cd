use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors opening the session database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock.
    #[error("Another instance of feedline appears to be running. Please close it and try again.")]
    InstanceLocked,

    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error, detecting SQLite lock contention.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_error(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

pub(crate) fn is_lock_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

/// Errors from a page-lifetime storage backend.
///
/// Callers in this crate treat every variant as "storage unavailable" and
/// carry on without persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("Snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
