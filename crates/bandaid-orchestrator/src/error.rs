use thiserror::Error;

/// Errors the orchestrator surfaces directly to its caller. Everything
/// else (detector failures, journal write errors, vector-store errors) is
/// contained internally and never reaches this
/// type.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("text to validate must not be empty")]
    EmptyInput,

    #[error(transparent)]
    Core(#[from] bandaid_core::Error),
}
