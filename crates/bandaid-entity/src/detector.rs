use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bandaid_catalog::PatternCatalog;
use bandaid_core::{Span, ThreatDetection, ThreatKind};
use tokio::sync::OnceCell;

use crate::error::EntityError;
use crate::tagger::{EntityLabel, NerTagger};

const TAGGER_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Result of one Entity Detector validation.
#[derive(Debug, Clone, Default)]
pub struct EntityResult {
    pub has_threats: bool,
    pub max_confidence: f64,
    pub grouped: HashMap<ThreatKind, Vec<Span>>,
    pub detections: Vec<ThreatDetection>,
}

/// Combines a pluggable [`NerTagger`] with the Pattern Catalog.
/// Initialization is lazy and serialized via `OnceCell`; if it fails, the
/// layer disables itself for the process lifetime after logging once,
/// rather than retrying the (presumably still-broken) model on every call.
pub struct EntityDetector {
    tagger: Arc<dyn NerTagger>,
    catalog: Arc<PatternCatalog>,
    init: OnceCell<()>,
    disabled: AtomicBool,
}

impl EntityDetector {
    pub fn new(tagger: Arc<dyn NerTagger>, catalog: Arc<PatternCatalog>) -> Self {
        Self {
            tagger,
            catalog,
            init: OnceCell::new(),
            disabled: AtomicBool::new(false),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    async fn ensure_initialized(&self) -> Result<(), EntityError> {
        if self.disabled.load(Ordering::Relaxed) {
            return Err(EntityError::InitFailed("detector disabled after prior init failure".into()));
        }
        let tagger = &self.tagger;
        let result = self
            .init
            .get_or_try_init(|| async { tagger.initialize().await })
            .await;

        if let Err(err) = &result {
            tracing::warn!(error = %err, "entity detector initialization failed, disabling layer");
            self.disabled.store(true, Ordering::Relaxed);
        }
        result.map(|_| ())
    }

    /// Runs the tagger and merges its PII-mapped output with the Pattern
    /// Catalog's own detections, unchanged. Non-fatal on tagger
    /// failure: callers should treat an `Err` as "entity layer contributed
    /// no signal this call" and continue with whatever the catalog alone
    /// produced.
    pub async fn validate(&self, text: &str) -> Result<EntityResult, EntityError> {
        self.ensure_initialized().await?;

        let tagged = self.tagger.tag(text).await.map_err(|err| {
            tracing::warn!(error = %err, "entity tagger failed during validate, continuing without NER signal");
            err
        })?;

        let mut detections: Vec<ThreatDetection> = tagged
            .into_iter()
            .filter(|e| e.confidence >= TAGGER_CONFIDENCE_THRESHOLD)
            .filter(|e| matches!(e.label, EntityLabel::Person | EntityLabel::Organization | EntityLabel::Location))
            .map(|e| ThreatDetection::new(ThreatKind::Pii, e.confidence as f64, e.span))
            .collect();

        detections.extend(self.catalog.detect(text));

        let has_threats = !detections.is_empty();
        let max_confidence = detections.iter().map(|d| d.confidence).fold(0.0, f64::max);

        let mut grouped: HashMap<ThreatKind, Vec<Span>> = HashMap::new();
        for d in &detections {
            grouped.entry(d.kind).or_default().push(d.matched_span);
        }

        Ok(EntityResult {
            has_threats,
            max_confidence,
            grouped,
            detections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::MockTagger;

    fn catalog() -> Arc<PatternCatalog> {
        Arc::new(PatternCatalog::new(bandaid_catalog::default_wordlist_path()))
    }

    #[tokio::test]
    async fn merges_ner_and_catalog_detections() {
        let detector = EntityDetector::new(Arc::new(MockTagger::default()), catalog());
        let result = detector.validate("My friend in Paris sent 0x742d35Cc6634C0532925a3b844Bc454e4438f44e").await.unwrap();
        assert!(result.has_threats);
        assert!(result.grouped.contains_key(&ThreatKind::Pii));
        assert!(result.grouped.contains_key(&ThreatKind::BlockchainAddress));
    }

    #[tokio::test]
    async fn benign_text_without_entities_has_no_threats() {
        let detector = EntityDetector::new(Arc::new(MockTagger::default()), catalog());
        let result = detector.validate("2 + 2 equals 4").await.unwrap();
        assert!(!result.has_threats);
        assert_eq!(result.max_confidence, 0.0);
    }
}
