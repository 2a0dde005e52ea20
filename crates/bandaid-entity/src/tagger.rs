use async_trait::async_trait;
use bandaid_core::Span;

use crate::error::EntityError;

/// Token-classification labels the tagger emits. Only PER/ORG/LOC are
/// mapped onward to `ThreatKind::Pii`; other tags a real model might
/// emit (MISC, etc.) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLabel {
    Person,
    Organization,
    Location,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEntity {
    pub label: EntityLabel,
    pub span: Span,
    pub confidence: f32,
}

/// Pluggable named-entity tagger backend. A real implementation wraps an
/// ONNX/candle token-classification model (`dslim/bert-base-NER` or
/// equivalent); tests and local development use [`MockTagger`].
#[async_trait]
pub trait NerTagger: Send + Sync {
    /// One-time (possibly expensive) model load. Called lazily on first use.
    async fn initialize(&self) -> Result<(), EntityError>;

    /// Tags `text`, returning every entity span the model found regardless
    /// of confidence — callers filter by the 0.7 threshold.
    async fn tag(&self, text: &str) -> Result<Vec<TaggedEntity>, EntityError>;
}

/// Deterministic tagger for tests: recognizes a fixed vocabulary of proper
/// nouns so pipeline tests don't depend on a real model.
pub struct MockTagger {
    vocabulary: Vec<(&'static str, EntityLabel, f32)>,
}

impl Default for MockTagger {
    fn default() -> Self {
        Self {
            vocabulary: vec![
                ("Paris", EntityLabel::Location, 0.95),
                ("London", EntityLabel::Location, 0.95),
                ("Acme Corp", EntityLabel::Organization, 0.9),
                ("John Smith", EntityLabel::Person, 0.92),
            ],
        }
    }
}

#[async_trait]
impl NerTagger for MockTagger {
    async fn initialize(&self) -> Result<(), EntityError> {
        Ok(())
    }

    async fn tag(&self, text: &str) -> Result<Vec<TaggedEntity>, EntityError> {
        let mut entities = Vec::new();
        for (needle, label, confidence) in &self.vocabulary {
            if let Some(start) = text.find(needle) {
                entities.push(TaggedEntity {
                    label: *label,
                    span: Span::new(start, start + needle.len()),
                    confidence: *confidence,
                });
            }
        }
        Ok(entities)
    }
}
