use chrono::{DateTime, Utc};
use uuid::Uuid;

use bandaid_core::{EventType, Severity, ThreatKind};

/// Filter set for [`crate::EventJournal::query`], mirroring `get_events`'s
/// optional-filter parameters one-for-one.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub event_type: Option<EventType>,
    pub threat_kind: Option<ThreatKind>,
    pub severity: Option<Severity>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub request_id: Option<Uuid>,
    pub limit: u32,
    pub offset: u32,
}

impl EventQuery {
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn with_threat_kind(mut self, kind: ThreatKind) -> Self {
        self.threat_kind = Some(kind);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Filters to the pre- and post-call events sharing one client request
    ///,
    /// using the indexed `request_id` column.
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

/// A page of query results. `has_more` is derived by requesting one extra
/// row beyond `limit` rather than issuing a separate `COUNT(*)` query — an
/// exact total would require scanning the full filtered set on every page,
/// which the dashboard's use case (paging through recent events) doesn't
/// need.
#[derive(Debug, Clone)]
pub struct EventPage {
    pub events: Vec<bandaid_core::SecurityEvent>,
    pub has_more: bool,
}
