use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error(transparent)]
    Core(#[from] bandaid_core::Error),
}
