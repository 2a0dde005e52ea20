use std::collections::HashMap;

use bandaid_core::ThreatKind;

/// Aggregate counters for the dashboard, mirroring
/// `get_stats`'s return shape.
#[derive(Debug, Clone, Default)]
pub struct JournalStats {
    pub total_events: u64,
    pub blocked_count: u64,
    pub allowed_count: u64,
    pub threat_breakdown: HashMap<ThreatKind, u64>,
}
