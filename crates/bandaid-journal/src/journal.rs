use std::str::FromStr;

use bandaid_core::{DetectionLayer, EventType, LearnedPattern, SecurityEvent, Severity, ThreatKind};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use uuid::Uuid;

use crate::error::JournalError;
use crate::query::{EventPage, EventQuery};
use crate::stats::JournalStats;

/// Connection parameters for the journal's backing SQLite database,
/// mirroring `vex-persist::sqlite::SqliteConfig`'s shape.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    pub url: String,
    pub max_connections: u32,
    pub wal_mode: bool,
    pub busy_timeout_secs: u32,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:./data/events.db?mode=rwc".to_string(),
            max_connections: 5,
            wal_mode: true,
            busy_timeout_secs: 30,
        }
    }
}

impl JournalConfig {
    /// In-memory database for tests.
    pub fn memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            wal_mode: false,
            busy_timeout_secs: 5,
        }
    }
}

/// The Event Journal: durable, queryable, append-mostly storage for
/// `SecurityEvent`s and their associated learned-pattern metadata.
#[derive(Debug)]
pub struct EventJournal {
    pool: SqlitePool,
}

impl EventJournal {
    pub async fn new_with_config(config: JournalConfig) -> Result<Self, JournalError> {
        let mut options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| JournalError::Connection(e.to_string()))?;

        options = options.pragma("foreign_keys", "ON");
        options = options.pragma("busy_timeout", config.busy_timeout_secs.to_string());
        if config.wal_mode {
            options = options.pragma("journal_mode", "WAL");
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| JournalError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| JournalError::Migration(e.to_string()))?;

        tracing::info!(url = %config.url, "event journal initialized");
        Ok(Self { pool })
    }

    pub async fn memory() -> Result<Self, JournalError> {
        Self::new_with_config(JournalConfig::memory()).await
    }

    pub async fn append(&self, event: &SecurityEvent) -> Result<(), JournalError> {
        let started = std::time::Instant::now();
        let result = self.append_inner(event).await;
        metrics::histogram!("bandaid_journal_write_latency_seconds").record(started.elapsed().as_secs_f64());
        if result.is_ok() {
            metrics::counter!("bandaid_journal_events_written_total", "event_type" => event.event_type.as_str()).increment(1);
        }
        result
    }

    async fn append_inner(&self, event: &SecurityEvent) -> Result<(), JournalError> {
        sqlx::query(
            "INSERT INTO security_events (
                id, timestamp, event_type, threat_type, confidence_level,
                request_id, redacted_content, severity_level, detection_layer,
                learned_pattern_id, provider, model
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(event.timestamp.to_rfc3339())
        .bind(event.event_type.as_str())
        .bind(event.threat_kind.map(|k| k.as_str()))
        .bind(event.confidence)
        .bind(event.request_id.to_string())
        .bind(&event.redacted_content)
        .bind(event.severity.as_str())
        .bind(event.detection_layer.map(|l| l.as_str()))
        .bind(event.learned_pattern_id.map(|id| id.to_string()))
        .bind(&event.provider)
        .bind(&event.model)
        .execute(&self.pool)
        .await?;

        tracing::debug!(event_id = %event.id, event_type = event.event_type.as_str(), "security event appended");
        Ok(())
    }

    pub async fn append_batch(&self, events: &[SecurityEvent]) -> Result<(), JournalError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for event in events {
            sqlx::query(
                "INSERT INTO security_events (
                    id, timestamp, event_type, threat_type, confidence_level,
                    request_id, redacted_content, severity_level, detection_layer,
                    learned_pattern_id, provider, model
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(event.id.to_string())
            .bind(event.timestamp.to_rfc3339())
            .bind(event.event_type.as_str())
            .bind(event.threat_kind.map(|k| k.as_str()))
            .bind(event.confidence)
            .bind(event.request_id.to_string())
            .bind(&event.redacted_content)
            .bind(event.severity.as_str())
            .bind(event.detection_layer.map(|l| l.as_str()))
            .bind(event.learned_pattern_id.map(|id| id.to_string()))
            .bind(&event.provider)
            .bind(&event.model)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        tracing::debug!(count = events.len(), "security events batch appended");
        Ok(())
    }

    pub async fn query(&self, filter: &EventQuery) -> Result<EventPage, JournalError> {
        let mut sql = String::from("SELECT * FROM security_events WHERE 1=1");
        if filter.event_type.is_some() {
            sql.push_str(" AND event_type = ?");
        }
        if filter.threat_kind.is_some() {
            sql.push_str(" AND threat_type = ?");
        }
        if filter.severity.is_some() {
            sql.push_str(" AND severity_level = ?");
        }
        if filter.start_time.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        if filter.end_time.is_some() {
            sql.push_str(" AND timestamp <= ?");
        }
        if filter.request_id.is_some() {
            sql.push_str(" AND request_id = ?");
        }
        sql.push_str(" ORDER BY timestamp DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(event_type) = filter.event_type {
            query = query.bind(event_type.as_str());
        }
        if let Some(kind) = filter.threat_kind {
            query = query.bind(kind.as_str());
        }
        if let Some(severity) = filter.severity {
            query = query.bind(severity.as_str());
        }
        if let Some(start) = filter.start_time {
            query = query.bind(start.to_rfc3339());
        }
        if let Some(end) = filter.end_time {
            query = query.bind(end.to_rfc3339());
        }
        if let Some(request_id) = filter.request_id {
            query = query.bind(request_id.to_string());
        }
        // Fetch one extra row to detect whether another page follows,
        // avoiding a separate COUNT(*) over the filtered set.
        query = query.bind(filter.limit as i64 + 1).bind(filter.offset as i64);

        let rows = query.fetch_all(&self.pool).await?;
        let has_more = rows.len() as u32 > filter.limit;
        let mut events: Vec<SecurityEvent> = rows
            .iter()
            .take(filter.limit as usize)
            .map(row_to_event)
            .collect::<Result<_, _>>()?;
        events.truncate(filter.limit as usize);

        Ok(EventPage { events, has_more })
    }

    pub async fn stats(&self) -> Result<JournalStats, JournalError> {
        let total_events: i64 = sqlx::query("SELECT COUNT(*) as c FROM security_events")
            .fetch_one(&self.pool)
            .await?
            .try_get("c")?;

        let blocked_count: i64 = sqlx::query(
            "SELECT COUNT(*) as c FROM security_events WHERE event_type = 'blocked'",
        )
        .fetch_one(&self.pool)
        .await?
        .try_get("c")?;

        let allowed_count: i64 = sqlx::query(
            "SELECT COUNT(*) as c FROM security_events WHERE event_type = 'allowed'",
        )
        .fetch_one(&self.pool)
        .await?
        .try_get("c")?;

        let rows = sqlx::query(
            "SELECT threat_type, COUNT(*) as c FROM security_events WHERE threat_type IS NOT NULL GROUP BY threat_type",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut threat_breakdown = std::collections::HashMap::new();
        for row in rows {
            let threat_type: String = row.try_get("threat_type")?;
            let count: i64 = row.try_get("c")?;
            if let Ok(kind) = ThreatKind::from_str(&threat_type) {
                threat_breakdown.insert(kind, count as u64);
            }
        }

        Ok(JournalStats {
            total_events: total_events as u64,
            blocked_count: blocked_count as u64,
            allowed_count: allowed_count as u64,
            threat_breakdown,
        })
    }

    /// Deletes every event with `timestamp < cutoff`, returning the count
    /// removed.
    pub async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, JournalError> {
        let result = sqlx::query("DELETE FROM security_events WHERE timestamp < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected();
        tracing::info!(deleted, cutoff = %cutoff, "retention purge complete");
        Ok(deleted)
    }

    pub async fn insert_pattern_metadata(&self, pattern: &LearnedPattern) -> Result<(), JournalError> {
        let threat_types: Vec<&str> = pattern.threat_kinds.iter().map(|k| k.as_str()).collect();
        let threat_types_json = serde_json::to_string(&threat_types)
            .map_err(|e| JournalError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO attack_pattern_metadata (
                id, threat_types, detection_count, first_seen, last_seen,
                source_event_id, redacted_text
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(pattern.id.to_string())
        .bind(threat_types_json)
        .bind(pattern.detection_count as i64)
        .bind(pattern.first_seen.to_rfc3339())
        .bind(pattern.last_seen.to_rfc3339())
        .bind(pattern.source_event_id.to_string())
        .bind(&pattern.redacted_text)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_pattern_metadata(
        &self,
        pattern_id: Uuid,
        detection_count: u64,
        last_seen: DateTime<Utc>,
    ) -> Result<(), JournalError> {
        sqlx::query(
            "UPDATE attack_pattern_metadata SET detection_count = ?, last_seen = ? WHERE id = ?",
        )
        .bind(detection_count as i64)
        .bind(last_seen.to_rfc3339())
        .bind(pattern_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_pattern_metadata(&self, pattern_id: Uuid) -> Result<Option<LearnedPattern>, JournalError> {
        let row = sqlx::query("SELECT * FROM attack_pattern_metadata WHERE id = ?")
            .bind(pattern_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_pattern(&r)).transpose()
    }

    /// Top `limit` patterns by detection count, for the dashboard
    /// contract; mirrors `get_top_patterns`).
    pub async fn get_top_patterns(&self, limit: u32) -> Result<Vec<LearnedPattern>, JournalError> {
        let rows = sqlx::query(
            "SELECT * FROM attack_pattern_metadata ORDER BY detection_count DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_pattern).collect()
    }
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<SecurityEvent, JournalError> {
    let id: String = row.try_get("id")?;
    let timestamp: String = row.try_get("timestamp")?;
    let event_type: String = row.try_get("event_type")?;
    let threat_type: Option<String> = row.try_get("threat_type")?;
    let confidence_level: Option<f64> = row.try_get("confidence_level")?;
    let request_id: String = row.try_get("request_id")?;
    let redacted_content: String = row.try_get("redacted_content")?;
    let severity_level: String = row.try_get("severity_level")?;
    let detection_layer: Option<String> = row.try_get("detection_layer")?;
    let learned_pattern_id: Option<String> = row.try_get("learned_pattern_id")?;
    let provider: Option<String> = row.try_get("provider")?;
    let model: Option<String> = row.try_get("model")?;

    Ok(SecurityEvent {
        id: Uuid::parse_str(&id).map_err(|e| JournalError::Query(e.to_string()))?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| JournalError::Query(e.to_string()))?
            .with_timezone(&Utc),
        event_type: EventType::from_str(&event_type)?,
        threat_kind: threat_type.as_deref().map(ThreatKind::from_str).transpose()?,
        confidence: confidence_level,
        request_id: Uuid::parse_str(&request_id).map_err(|e| JournalError::Query(e.to_string()))?,
        redacted_content,
        severity: Severity::from_str(&severity_level)?,
        detection_layer: detection_layer.as_deref().map(DetectionLayer::from_str).transpose()?,
        learned_pattern_id: learned_pattern_id
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| JournalError::Query(e.to_string()))?,
        provider,
        model,
    })
}

fn row_to_pattern(row: &sqlx::sqlite::SqliteRow) -> Result<LearnedPattern, JournalError> {
    let id: String = row.try_get("id")?;
    let threat_types_json: String = row.try_get("threat_types")?;
    let detection_count: i64 = row.try_get("detection_count")?;
    let first_seen: String = row.try_get("first_seen")?;
    let last_seen: String = row.try_get("last_seen")?;
    let source_event_id: String = row.try_get("source_event_id")?;
    let redacted_text: String = row.try_get("redacted_text")?;

    let threat_type_strs: Vec<String> =
        serde_json::from_str(&threat_types_json).map_err(|e| JournalError::Query(e.to_string()))?;
    let threat_kinds = threat_type_strs
        .iter()
        .map(|s| ThreatKind::from_str(s))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LearnedPattern {
        id: Uuid::parse_str(&id).map_err(|e| JournalError::Query(e.to_string()))?,
        threat_kinds,
        detection_count: detection_count as u64,
        first_seen: DateTime::parse_from_rfc3339(&first_seen)
            .map_err(|e| JournalError::Query(e.to_string()))?
            .with_timezone(&Utc),
        last_seen: DateTime::parse_from_rfc3339(&last_seen)
            .map_err(|e| JournalError::Query(e.to_string()))?
            .with_timezone(&Utc),
        source_event_id: Uuid::parse_str(&source_event_id).map_err(|e| JournalError::Query(e.to_string()))?,
        redacted_text,
        embedding: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandaid_core::SecurityEvent;

    async fn journal() -> EventJournal {
        EventJournal::memory().await.expect("in-memory journal should initialize")
    }

    fn sample_event(event_type: EventType, threat_kind: Option<ThreatKind>) -> SecurityEvent {
        SecurityEvent::new(
            event_type,
            threat_kind,
            threat_kind.map(|_| 0.9),
            Uuid::new_v4(),
            "redacted body".to_string(),
            Severity::High,
            threat_kind.map(|_| DetectionLayer::Regex),
            None,
            Some("openai".to_string()),
            Some("gpt-4".to_string()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn append_and_query_roundtrips() {
        let j = journal().await;
        let event = sample_event(EventType::Blocked, Some(ThreatKind::PromptInjection));
        j.append(&event).await.unwrap();

        let page = j.query(&EventQuery::new()).await.unwrap();
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.events[0].id, event.id);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn query_filters_by_event_type() {
        let j = journal().await;
        j.append(&sample_event(EventType::Blocked, Some(ThreatKind::PromptInjection)))
            .await
            .unwrap();
        j.append(&sample_event(EventType::Allowed, None)).await.unwrap();

        let page = j
            .query(&EventQuery::new().with_event_type(EventType::Allowed))
            .await
            .unwrap();
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.events[0].event_type, EventType::Allowed);
    }

    #[tokio::test]
    async fn query_groups_pre_and_post_call_events_by_request_id() {
        let j = journal().await;
        let request_id = Uuid::new_v4();

        let pre_call = SecurityEvent::new(
            EventType::Blocked,
            Some(ThreatKind::PromptInjection),
            Some(0.95),
            request_id,
            "redacted prompt".to_string(),
            Severity::Critical,
            Some(DetectionLayer::Regex),
            None,
            Some("openai".to_string()),
            Some("gpt-4".to_string()),
        )
        .unwrap();
        let post_call = SecurityEvent::new(
            EventType::DataLeakAlert,
            Some(ThreatKind::Pii),
            Some(0.8),
            request_id,
            "redacted response".to_string(),
            Severity::High,
            Some(DetectionLayer::Ner),
            None,
            Some("openai".to_string()),
            Some("gpt-4".to_string()),
        )
        .unwrap();
        j.append(&pre_call).await.unwrap();
        j.append(&post_call).await.unwrap();
        j.append(&sample_event(EventType::Allowed, None)).await.unwrap();

        let page = j.query(&EventQuery::new().with_request_id(request_id)).await.unwrap();
        assert_eq!(page.events.len(), 2);
        assert!(page.events.iter().all(|e| e.request_id == request_id));
    }

    #[tokio::test]
    async fn stats_counts_match_inserted_events() {
        let j = journal().await;
        j.append(&sample_event(EventType::Blocked, Some(ThreatKind::PromptInjection)))
            .await
            .unwrap();
        j.append(&sample_event(EventType::Allowed, None)).await.unwrap();

        let stats = j.stats().await.unwrap();
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.blocked_count, 1);
        assert_eq!(stats.allowed_count, 1);
        assert_eq!(stats.threat_breakdown.get(&ThreatKind::PromptInjection), Some(&1));
    }

    #[tokio::test]
    async fn purge_before_removes_old_events_only() {
        let j = journal().await;
        j.append(&sample_event(EventType::Blocked, Some(ThreatKind::PromptInjection)))
            .await
            .unwrap();

        let future_cutoff = Utc::now() + chrono::Duration::seconds(60);
        let deleted = j.purge_before(future_cutoff).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(j.stats().await.unwrap().total_events, 0);
    }

    #[tokio::test]
    async fn pattern_metadata_roundtrips_and_orders_by_detection_count() {
        let j = journal().await;
        let event = sample_event(EventType::Blocked, Some(ThreatKind::PromptInjection));
        j.append(&event).await.unwrap();

        let pattern = LearnedPattern::new(
            vec![ThreatKind::PromptInjection],
            event.id,
            "ignore all previous".to_string(),
            vec![0.1, 0.2, 0.3],
        )
        .unwrap();
        j.insert_pattern_metadata(&pattern).await.unwrap();

        let fetched = j.get_pattern_metadata(pattern.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, pattern.id);
        assert_eq!(fetched.detection_count, 1);

        j.update_pattern_metadata(pattern.id, 5, Utc::now()).await.unwrap();
        let top = j.get_top_patterns(10).await.unwrap();
        assert_eq!(top[0].detection_count, 5);
    }
}
