use spillover_core::TreeError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        detail: String,
    },

    #[error("IO error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, msg)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let detail = msg.as_deref().unwrap_or_default();
                tracing::debug!(detail, "constraint violation");
                StoreError::Conflict(conflict_message(detail).into())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

/// Caller-facing text for a constraint violation. Raw SQLite text never leaves the store.
fn conflict_message(detail: &str) -> &'static str {
    if detail.contains("members.email") {
        "Email already registered"
    } else if detail.contains("members.member_code") {
        "Member code already in use"
    } else {
        "Duplicate value"
    }
}

impl From<StoreError> for TreeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => TreeError::NotFound(what),
            StoreError::Conflict(what) => TreeError::Conflict(what),
            other => TreeError::Storage(other.to_string()),
        }
    }
}
