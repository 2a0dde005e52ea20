//! Shared data model for the bandaid validation pipeline.
//!
//! ```rust
//! use bandaid_core::{ConfidenceThresholds, ThreatKind};
//!
//! let thresholds = ConfidenceThresholds::default();
//! assert_eq!(thresholds.tier(0.95), bandaid_core::ConfidenceTier::High);
//! assert_eq!(ThreatKind::PromptInjection.as_str(), "prompt_injection");
//! ```

mod confidence;
mod error;
mod event;
mod pattern;
mod threat;

pub use confidence::{ConfidenceThresholds, ConfidenceTier};
pub use error::Error;
pub use event::{DetectionLayer, EventType, SecurityEvent, Severity};
pub use pattern::LearnedPattern;
pub use threat::{Span, ThreatDetection, ThreatKind};
