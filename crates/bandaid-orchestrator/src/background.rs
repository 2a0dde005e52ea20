use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use bandaid_core::{ConfidenceThresholds, DetectionLayer, EventType, Severity, ThreatKind};
use bandaid_entity::EntityDetector;
use bandaid_journal::EventJournal;
use bandaid_memory::{AbsorbOutcome, PatternMemory};
use tokio::sync::{mpsc, Notify, Semaphore};
use uuid::Uuid;

use crate::decision::{get_severity, severity_floor};
use crate::redact::build_redacted_content;

/// A pending learn-pattern absorption, enqueued fire-and-forget from
/// `ValidationOrchestrator::validate`.
#[derive(Debug, Clone)]
pub struct LearnTask {
    pub text: String,
    pub kinds: Vec<ThreatKind>,
    pub confidence: f64,
    pub source_event_id: Uuid,
}

/// A pending response-side leak scan.
#[derive(Debug, Clone)]
pub struct LeakScanTask {
    pub text: String,
    pub request_id: Uuid,
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Bounded ring buffer that drops the oldest entry on overflow rather than
/// rejecting the newest — the overflow policy used on the learning
/// queue ("losing a learn-event is acceptable"). `tokio::sync::mpsc`'s
/// `try_send` only rejects the newest item, so this is a small
/// purpose-built queue instead of a channel.
struct LearnRing {
    inner: Mutex<VecDeque<LearnTask>>,
    notify: Notify,
    capacity: usize,
}

impl LearnRing {
    fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
        }
    }

    fn push(&self, task: LearnTask) {
        let mut queue = self.inner.lock().expect("learn ring mutex poisoned");
        if queue.len() >= self.capacity {
            queue.pop_front();
            tracing::warn!("learning queue full, dropping oldest pending task");
        }
        queue.push_back(task);
        drop(queue);
        self.notify.notify_one();
    }

    async fn pop(&self) -> LearnTask {
        loop {
            {
                let mut queue = self.inner.lock().expect("learn ring mutex poisoned");
                if let Some(task) = queue.pop_front() {
                    return task;
                }
            }
            self.notify.notified().await;
        }
    }
}

/// Drains the fire-and-forget learning and leak-scanning queues on
/// background tasks, bounding memory with the drop-oldest/backpressure
/// policies. Constructed once per orchestrator and shared
/// across all requests.
pub struct BackgroundWorker {
    learn_ring: Arc<LearnRing>,
    leak_tx: mpsc::Sender<LeakScanTask>,
}

impl BackgroundWorker {
    pub fn spawn(
        memory: Arc<PatternMemory>,
        entity: Arc<EntityDetector>,
        journal: Arc<EventJournal>,
        thresholds: ConfidenceThresholds,
        learn_queue_capacity: usize,
        leak_queue_capacity: usize,
        leak_concurrency: usize,
    ) -> Self {
        let learn_ring = Arc::new(LearnRing::new(learn_queue_capacity));
        {
            let ring = learn_ring.clone();
            let journal = journal.clone();
            tokio::spawn(async move {
                loop {
                    let task = ring.pop().await;
                    match memory
                        .absorb(&task.text, task.kinds.clone(), task.confidence, task.source_event_id)
                        .await
                    {
                        Ok(AbsorbOutcome::New(id)) => {
                            tracing::info!(pattern_id = %id, "background learning absorbed new pattern");
                            mirror_new_pattern(&memory, &journal, id).await;
                        }
                        Ok(AbsorbOutcome::Duplicate(id)) => {
                            tracing::debug!(pattern_id = %id, "background learning recognized a duplicate pattern");
                            mirror_duplicate_pattern(&memory, &journal, id).await;
                        }
                        Err(err) => tracing::warn!(error = %err, "background learning failed"),
                    }
                }
            });
        }

        let (leak_tx, mut leak_rx) = mpsc::channel::<LeakScanTask>(leak_queue_capacity);
        tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(leak_concurrency));
            while let Some(task) = leak_rx.recv().await {
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("leak-scan semaphore closed unexpectedly");
                let entity = entity.clone();
                let journal = journal.clone();
                let thresholds = thresholds;
                tokio::spawn(async move {
                    let _permit = permit;
                    run_leak_scan(&entity, &journal, &thresholds, task).await;
                });
            }
        });

        Self { learn_ring, leak_tx }
    }

    /// Enqueues a learn task; never blocks the caller.
    pub fn enqueue_learn(&self, task: LearnTask) {
        self.learn_ring.push(task);
    }

    /// Enqueues a leak-scan task. Awaits only when the bounded channel is
    /// full, which briefly backpressures the caller rather than dropping
    /// the task.
    pub async fn enqueue_leak_scan(&self, task: LeakScanTask) {
        if self.leak_tx.send(task).await.is_err() {
            tracing::warn!("leak-scan worker unavailable, dropping scan task");
        }
    }
}

/// Mirrors a freshly absorbed pattern into the journal's relational store
/// so `EventJournal::get_pattern_metadata`/`get_top_patterns` see it and a
/// later `learned_pattern_id` foreign key referencing it resolves.
async fn mirror_new_pattern(memory: &PatternMemory, journal: &EventJournal, pattern_id: Uuid) {
    let Some(pattern) = memory.get(pattern_id).await else {
        tracing::warn!(pattern_id = %pattern_id, "pattern vanished before its metadata could be mirrored");
        return;
    };
    if let Err(err) = journal.insert_pattern_metadata(&pattern).await {
        tracing::warn!(error = %err, pattern_id = %pattern_id, "failed to mirror new pattern metadata");
    }
}

/// Mirrors a duplicate-absorption's `detection_count`/`last_seen` bump into
/// the journal's relational store, keeping it in sync with the vector
/// store's copy.
async fn mirror_duplicate_pattern(memory: &PatternMemory, journal: &EventJournal, pattern_id: Uuid) {
    let Some(pattern) = memory.get(pattern_id).await else {
        tracing::warn!(pattern_id = %pattern_id, "pattern vanished before its metadata could be mirrored");
        return;
    };
    if let Err(err) = journal
        .update_pattern_metadata(pattern_id, pattern.detection_count, pattern.last_seen)
        .await
    {
        tracing::warn!(error = %err, pattern_id = %pattern_id, "failed to mirror pattern metadata update");
    }
}

async fn run_leak_scan(
    entity: &EntityDetector,
    journal: &EventJournal,
    thresholds: &ConfidenceThresholds,
    task: LeakScanTask,
) {
    let result = match entity.validate(&task.text).await {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(error = %err, "entity detector failed during leak scan");
            return;
        }
    };

    if !result.has_threats {
        return;
    }

    let mut confidence_by_kind: HashMap<ThreatKind, f64> = HashMap::new();
    for detection in &result.detections {
        let entry = confidence_by_kind.entry(detection.kind).or_insert(0.0);
        if detection.confidence > *entry {
            *entry = detection.confidence;
        }
    }

    let counts: HashMap<ThreatKind, usize> = result.grouped.iter().map(|(k, spans)| (*k, spans.len())).collect();

    for (kind, confidence) in confidence_by_kind {
        let severity = severity_floor(get_severity(thresholds, confidence, Some(kind)), Severity::High);
        let redacted_content = build_redacted_content(&task.text, &counts, None);

        let event = match bandaid_core::SecurityEvent::new(
            EventType::DataLeakAlert,
            Some(kind),
            Some(confidence),
            task.request_id,
            redacted_content,
            severity,
            Some(DetectionLayer::Ner),
            None,
            task.provider.clone(),
            task.model.clone(),
        ) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "failed to construct data-leak-alert event");
                continue;
            }
        };

        if let Err(err) = journal.append(&event).await {
            tracing::warn!(error = %err, "failed to journal data-leak-alert event");
        }
    }
}
