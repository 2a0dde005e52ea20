use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("policy backend failed to initialize: {0}")]
    InitFailed(String),

    #[error("policy backend failed during classification: {0}")]
    ClassificationFailed(String),
}
