//! Entity Detector layer — NER tagging merged with the Pattern Catalog
//!.

mod detector;
mod error;
mod tagger;

pub use detector::{EntityDetector, EntityResult};
pub use error::EntityError;
pub use tagger::{EntityLabel, MockTagger, NerTagger, TaggedEntity};
