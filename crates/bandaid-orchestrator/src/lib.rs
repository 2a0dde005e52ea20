//! The Validation Orchestrator: runs the full multi-layer pipeline
//! for one prompt, tiers the resulting confidence into a block/allow
//! decision, and drives the fire-and-forget background work (learning,
//! response-side leak scanning) that follows a decision.

mod background;
mod decision;
mod error;
mod orchestrator;
mod redact;
mod streaming;

pub use background::{BackgroundWorker, LeakScanTask, LearnTask};
pub use decision::{get_action, get_severity, should_block, severity_floor, Action};
pub use error::OrchestratorError;
pub use orchestrator::ValidationOrchestrator;
pub use redact::build_redacted_content;
pub use streaming::StreamBuffer;
