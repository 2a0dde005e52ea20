use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::threat::ThreatKind;

/// A confirmed attack pattern absorbed into the learned-pattern memory,
/// carrying its embedding alongside the relational metadata that mirrors it
/// in the event journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub id: Uuid,
    pub threat_kinds: Vec<ThreatKind>,
    pub detection_count: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub source_event_id: Uuid,
    pub redacted_text: String,
    pub embedding: Vec<f32>,
}

impl LearnedPattern {
    pub fn new(
        threat_kinds: Vec<ThreatKind>,
        source_event_id: Uuid,
        redacted_text: String,
        embedding: Vec<f32>,
    ) -> Result<Self, crate::Error> {
        if threat_kinds.is_empty() {
            return Err(crate::Error::InvariantViolation {
                reason: "learned pattern must have at least one threat kind".into(),
            });
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            threat_kinds,
            detection_count: 1,
            first_seen: now,
            last_seen: now,
            source_event_id,
            redacted_text,
            embedding,
        })
    }

    pub fn record_recurrence(&mut self) {
        self.detection_count += 1;
        self.last_seen = Utc::now();
    }
}
