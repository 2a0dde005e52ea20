use thiserror::Error;

/// Aggregate error type shared across the `bandaid-*` crates.
///
/// Mirrors the cause-based taxonomy of the pipeline's error handling design:
/// configuration errors are fatal at startup, model/runtime errors degrade a
/// single layer, and storage errors are contained rather than propagated
/// into a block/allow decision. Each crate also defines its own narrower
/// error enum at its seam (`CatalogError`, `VectorError`, `JournalError`,
/// ...) and converts into this one only at the orchestrator boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid confidence thresholds: {reason}")]
    InvalidConfidenceThresholds { reason: String },

    #[error("data model invariant violated: {reason}")]
    InvariantViolation { reason: String },

    #[error("unknown value for enum field `{field}`: {value}")]
    UnknownEnumValue { field: &'static str, value: String },

    #[error("empty input: {0}")]
    EmptyInput(&'static str),
}
