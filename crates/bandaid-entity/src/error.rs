use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntityError {
    #[error("NER tagger failed to initialize: {0}")]
    InitFailed(String),

    #[error("NER tagger failed during tagging: {0}")]
    TaggingFailed(String),
}
