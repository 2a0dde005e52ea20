use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::threat::ThreatKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Blocked,
    Allowed,
    MediumConfidenceWarning,
    DataLeakAlert,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Blocked => "blocked",
            EventType::Allowed => "allowed",
            EventType::MediumConfidenceWarning => "medium_confidence_warning",
            EventType::DataLeakAlert => "data_leak_alert",
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blocked" => Ok(EventType::Blocked),
            "allowed" => Ok(EventType::Allowed),
            "medium_confidence_warning" => Ok(EventType::MediumConfidenceWarning),
            "data_leak_alert" => Ok(EventType::DataLeakAlert),
            other => Err(crate::Error::UnknownEnumValue {
                field: "event_type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            other => Err(crate::Error::UnknownEnumValue {
                field: "severity",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionLayer {
    Regex,
    Ner,
    Guard,
    EmbeddingMatch,
    SeedPhrase,
}

impl DetectionLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionLayer::Regex => "regex",
            DetectionLayer::Ner => "ner",
            DetectionLayer::Guard => "guard",
            DetectionLayer::EmbeddingMatch => "embedding_match",
            DetectionLayer::SeedPhrase => "seed_phrase",
        }
    }
}

impl std::str::FromStr for DetectionLayer {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regex" => Ok(DetectionLayer::Regex),
            "ner" => Ok(DetectionLayer::Ner),
            "guard" => Ok(DetectionLayer::Guard),
            "embedding_match" => Ok(DetectionLayer::EmbeddingMatch),
            "seed_phrase" => Ok(DetectionLayer::SeedPhrase),
            other => Err(crate::Error::UnknownEnumValue {
                field: "detection_layer",
                value: other.to_string(),
            }),
        }
    }
}

/// A decision made by the orchestrator, immutable once written to the
/// journal. `threat_kind` and `confidence` are either both present or both
/// absent (enforced by [`SecurityEvent::new`] / the builder methods below,
/// not by the type system, to keep the struct serde-friendly for sqlx).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub threat_kind: Option<ThreatKind>,
    pub confidence: Option<f64>,
    pub request_id: Uuid,
    pub redacted_content: String,
    pub severity: Severity,
    pub detection_layer: Option<DetectionLayer>,
    pub learned_pattern_id: Option<Uuid>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl SecurityEvent {
    /// Builds an event, enforcing the `threat_kind`/`confidence` co-presence
    /// invariant from the data model.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_type: EventType,
        threat_kind: Option<ThreatKind>,
        confidence: Option<f64>,
        request_id: Uuid,
        redacted_content: String,
        severity: Severity,
        detection_layer: Option<DetectionLayer>,
        learned_pattern_id: Option<Uuid>,
        provider: Option<String>,
        model: Option<String>,
    ) -> Result<Self, crate::Error> {
        if threat_kind.is_some() != confidence.is_some() {
            return Err(crate::Error::InvariantViolation {
                reason: "threat_kind and confidence must be set together".into(),
            });
        }
        if let Some(c) = confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(crate::Error::InvariantViolation {
                    reason: "confidence must lie in [0.0, 1.0]".into(),
                });
            }
        }
        Ok(Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            threat_kind,
            confidence,
            request_id,
            redacted_content,
            severity,
            detection_layer,
            learned_pattern_id,
            provider,
            model,
        })
    }
}
