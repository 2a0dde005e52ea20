use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal connection failed: {0}")]
    Connection(String),

    #[error("journal migration failed: {0}")]
    Migration(String),

    #[error("journal query failed: {0}")]
    Query(String),

    #[error(transparent)]
    Core(#[from] bandaid_core::Error),
}

impl From<sqlx::Error> for JournalError {
    fn from(err: sqlx::Error) -> Self {
        JournalError::Query(err.to_string())
    }
}
