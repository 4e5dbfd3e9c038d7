//! # Message Consumer Worker
//!
//! Bridges the broker and the strategy chain:
//!
//! ```text
//! broker --(ingestion task)--> ProcessingQueue --(N processing tasks)--> orchestrator
//!                                    ^                                       |
//!                                    +------------- requeue (transient) -----+
//! ```
//!
//! The ingestion task never blocks on processing: it classifies each message,
//! admits it to the queue and returns to the broker. Processing tasks compete
//! for items and decide between success, requeue and permanent failure using
//! the configured [`ErrorClassifier`].
//!
//! ## Shutdown
//!
//! Admissions stop first and the ingestion task is cancelled. Processing tasks
//! keep running until the queue and the in-flight set are empty or the drain
//! timeout elapses, then the queue is closed and the tasks are aborted. Items
//! still in flight at that point are abandoned.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::errors::{WorkerError, WorkerResult};
use super::stats::{WorkerStats, WorkerStatsSnapshot};
use super::status::{ItemState, ItemStatus, ItemStatusRegistry};
use crate::config::WorkerConfig;
use crate::logging::{log_error, log_item_operation};
use crate::messaging::{BrokerMessage, MessageBroker, MessageHandler};
use crate::orchestration::{ErrorClassifier, StandardErrorClassifier, StrategyOrchestrator};
use crate::queue::{MessagePriority, ProcessingQueue, QueuedItem};

const ABANDONED_AT_SHUTDOWN: &str = "Abandoned during shutdown";

/// Priority assigned to an inbound message.
///
/// Broker redeliveries go to `Low`. Requests whose `speechDto.user_uuid`
/// contains `high_value_marker` (case-insensitive) go to `High`. `Critical`
/// is never assigned here.
pub fn determine_priority(message: &BrokerMessage, high_value_marker: &str) -> MessagePriority {
    if message.retry_count > 0 {
        return MessagePriority::Low;
    }

    let marker = high_value_marker.to_lowercase();
    let high_value = !marker.is_empty()
        && message
            .user_uuid()
            .is_some_and(|user| user.to_lowercase().contains(&marker));

    if high_value {
        MessagePriority::High
    } else {
        MessagePriority::Normal
    }
}

/// Outcome of [`MessageConsumerWorker::shutdown`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// Queue and in-flight set emptied before the drain timeout
    pub drained: bool,
    pub remaining_in_queue: usize,
    pub abandoned_in_flight: usize,
    pub stats: WorkerStatsSnapshot,
}

/// State shared by the ingestion handler and the processing tasks
#[derive(Debug)]
struct WorkerShared {
    queue: Arc<ProcessingQueue>,
    stats: WorkerStats,
    statuses: ItemStatusRegistry,
    /// Items taken from the queue and not yet settled
    in_flight: DashMap<String, (MessagePriority, u32)>,
    admitting: AtomicBool,
    high_value_marker: String,
}

struct IngestionHandler {
    shared: Arc<WorkerShared>,
}

#[async_trait]
impl MessageHandler for IngestionHandler {
    async fn handle(&self, message: BrokerMessage) {
        let shared = &self.shared;
        if !shared.admitting.load(Ordering::SeqCst) {
            debug!(message_id = %message.id, "Admissions stopped, ignoring message");
            return;
        }

        shared.stats.record_received();
        let priority = determine_priority(&message, &shared.high_value_marker);

        // Recorded before admission so a fast processor cannot be overwritten
        shared
            .statuses
            .record(&message.id, ItemState::Queued, priority, 0, None);

        if shared.queue.enqueue(message.to_payload(), priority) {
            debug!(
                message_id = %message.id,
                priority = %priority,
                queue_size = shared.queue.size(),
                "Message enqueued"
            );
        } else {
            shared.stats.record_failed();
            shared.statuses.record(
                &message.id,
                ItemState::Failed,
                priority,
                0,
                Some("Processing queue refused the message".to_string()),
            );
            log_error(
                "ingestion",
                "enqueue",
                "processing queue full or closed",
                Some(message.id.as_str()),
            );
        }
    }
}

/// One of the competing processing tasks
struct Processor {
    name: String,
    shared: Arc<WorkerShared>,
    orchestrator: Arc<StrategyOrchestrator>,
    classifier: Arc<dyn ErrorClassifier>,
    idle_poll_interval: std::time::Duration,
}

impl Processor {
    async fn run(self) {
        info!(processor = %self.name, "🎯 Starting processing loop");

        loop {
            let queue = &self.shared.queue;
            if queue.is_closed() && queue.is_empty() {
                break;
            }

            let claimed = queue
                .dequeue_timeout_with(self.idle_poll_interval, |item| {
                    self.shared
                        .in_flight
                        .insert(item.id.clone(), (item.priority, item.retry_count));
                })
                .await;
            match claimed {
                Some(item) => self.process_item(item).await,
                None => continue,
            }
        }

        info!(processor = %self.name, "✅ Processing loop finished");
    }

    async fn process_item(&self, item: QueuedItem) {
        let shared = &self.shared;
        shared.statuses.record(
            &item.id,
            ItemState::Processing,
            item.priority,
            item.retry_count,
            None,
        );
        log_item_operation(
            "process",
            Some(item.id.as_str()),
            Some(item.priority.as_str()),
            Some(item.retry_count),
            "started",
            Some(self.name.as_str()),
        );

        let started = Instant::now();
        let outcome = self.orchestrator.process(&item.payload).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if outcome.overall_success {
            shared.stats.record_processed();
            shared.statuses.record(
                &item.id,
                ItemState::Completed,
                item.priority,
                item.retry_count,
                None,
            );
            info!(
                processor = %self.name,
                item_id = %item.id,
                elapsed_ms = elapsed_ms,
                strategies = outcome.strategies_executed(),
                "✅ Item processed successfully"
            );
            shared.in_flight.remove(&item.id);
            return;
        }

        let classification = self.classifier.classify(&outcome);
        let item_id = item.id.clone();
        let priority = item.priority;
        let retry_count = item.retry_count;

        if classification.is_retryable() {
            shared.statuses.record(
                &item_id,
                ItemState::Retrying,
                priority,
                retry_count + 1,
                classification.reason.clone(),
            );
            let requeued = shared.queue.requeue(item);
            // Removed only after the requeue so a drain never sees the item missing
            shared.in_flight.remove(&item_id);

            if requeued {
                shared.stats.record_requeued();
                warn!(
                    processor = %self.name,
                    item_id = %item_id,
                    retry_count = retry_count + 1,
                    reason = ?classification.reason,
                    "🔄 Item failed, requeued for retry"
                );
                return;
            }

            shared.stats.record_failed();
            shared.statuses.record(
                &item_id,
                ItemState::Failed,
                priority,
                retry_count + 1,
                classification.reason.clone(),
            );
            error!(
                processor = %self.name,
                item_id = %item_id,
                retry_count = retry_count + 1,
                "❌ Item could not be requeued, failed permanently"
            );
            return;
        }

        shared.stats.record_failed();
        shared.statuses.record(
            &item_id,
            ItemState::Failed,
            priority,
            retry_count,
            classification.reason.clone(),
        );
        shared.in_flight.remove(&item_id);
        error!(
            processor = %self.name,
            item_id = %item_id,
            class = ?classification.class,
            failed_strategies = ?outcome.failed_strategies(),
            reason = ?classification.reason,
            "❌ Item failed permanently"
        );
    }
}

#[derive(Default)]
struct WorkerTasks {
    ingestion: Option<JoinHandle<()>>,
    processors: Vec<JoinHandle<()>>,
    monitor: Option<JoinHandle<()>>,
}

/// Consumes broker messages and runs them through the strategy chain
pub struct MessageConsumerWorker {
    config: WorkerConfig,
    broker: Arc<dyn MessageBroker>,
    orchestrator: Arc<StrategyOrchestrator>,
    classifier: Arc<dyn ErrorClassifier>,
    shared: Arc<WorkerShared>,
    tasks: Mutex<WorkerTasks>,
    running: AtomicBool,
    shutting_down: AtomicBool,
}

impl std::fmt::Debug for MessageConsumerWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageConsumerWorker")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("queue_size", &self.shared.queue.size())
            .finish_non_exhaustive()
    }
}

impl MessageConsumerWorker {
    pub fn new(
        config: WorkerConfig,
        broker: Arc<dyn MessageBroker>,
        queue: Arc<ProcessingQueue>,
        orchestrator: Arc<StrategyOrchestrator>,
    ) -> Self {
        let shared = Arc::new(WorkerShared {
            queue,
            stats: WorkerStats::new(),
            statuses: ItemStatusRegistry::new(config.status_retention),
            in_flight: DashMap::new(),
            admitting: AtomicBool::new(false),
            high_value_marker: config.high_value_marker.clone(),
        });

        Self {
            config,
            broker,
            orchestrator,
            classifier: Arc::new(StandardErrorClassifier::new()),
            shared,
            tasks: Mutex::new(WorkerTasks::default()),
            running: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Replace the retry policy
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn queue(&self) -> &Arc<ProcessingQueue> {
        &self.shared.queue
    }

    /// Connect, initialize every strategy and spawn the worker tasks.
    ///
    /// Returns once the tasks are running. A worker whose queue was closed by a
    /// previous shutdown refuses to start with `WorkerError::QueueClosed`.
    pub async fn start(&self) -> WorkerResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WorkerError::AlreadyRunning);
        }
        if self.shared.queue.is_closed() {
            self.running.store(false, Ordering::SeqCst);
            return Err(WorkerError::QueueClosed);
        }

        info!(
            processors = self.config.concurrent_processors,
            strategies = self.orchestrator.len(),
            "🚀 Starting message consumer worker"
        );

        if let Err(e) = self.prepare().await {
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        self.shared.stats.mark_started();
        self.shared.admitting.store(true, Ordering::SeqCst);

        let ingestion = self.spawn_ingestion();
        let processors = (0..self.config.concurrent_processors)
            .map(|index| self.spawn_processor(index))
            .collect();
        let monitor = self.spawn_monitor();

        *self.tasks.lock() = WorkerTasks {
            ingestion: Some(ingestion),
            processors,
            monitor,
        };

        info!("✅ Message consumer worker started");
        Ok(())
    }

    async fn prepare(&self) -> WorkerResult<()> {
        self.broker.connect().await?;
        self.orchestrator.initialize_all().await?;
        Ok(())
    }

    fn spawn_ingestion(&self) -> JoinHandle<()> {
        let broker = self.broker.clone();
        let shared = self.shared.clone();
        let handler: Arc<dyn MessageHandler> = Arc::new(IngestionHandler {
            shared: shared.clone(),
        });

        tokio::spawn(async move {
            info!("📥 Starting broker ingestion");
            if let Err(e) = broker.consume(handler).await {
                log_error("ingestion", "consume", &e.to_string(), None);
                shared.admitting.store(false, Ordering::SeqCst);
            }
            info!("📭 Broker ingestion finished");
        })
    }

    fn spawn_processor(&self, index: usize) -> JoinHandle<()> {
        let processor = Processor {
            name: format!("queue_processor_{index}"),
            shared: self.shared.clone(),
            orchestrator: self.orchestrator.clone(),
            classifier: self.classifier.clone(),
            idle_poll_interval: self.config.idle_poll_interval(),
        };
        tokio::spawn(processor.run())
    }

    fn spawn_monitor(&self) -> Option<JoinHandle<()>> {
        let interval = self.config.stats_interval()?;
        let shared = self.shared.clone();
        let processors = self.config.concurrent_processors;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let snapshot = shared.stats.snapshot(processors, shared.queue.get_stats());
                info!(
                    received = snapshot.counters.received,
                    processed = snapshot.counters.processed,
                    failed = snapshot.counters.failed,
                    requeued = snapshot.counters.requeued,
                    queue_size = snapshot.queue.current_size,
                    uptime_seconds = snapshot.uptime_seconds,
                    "📊 Worker statistics"
                );
            }
        }))
    }

    /// Point-in-time counters, uptime and queue statistics
    pub fn stats(&self) -> WorkerStatsSnapshot {
        self.shared.stats.snapshot(
            self.config.concurrent_processors,
            self.shared.queue.get_stats(),
        )
    }

    /// Latest known lifecycle state of an item
    pub fn item_status(&self, item_id: &str) -> Option<ItemStatus> {
        self.shared.statuses.get(item_id)
    }

    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.len()
    }

    /// Stop admissions, drain within the configured timeout, then tear down
    pub async fn shutdown(&self) -> WorkerResult<ShutdownReport> {
        if !self.is_running() {
            return Err(WorkerError::NotRunning);
        }
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return Err(WorkerError::ShutdownInProgress);
        }

        info!(
            queue_size = self.shared.queue.size(),
            in_flight = self.in_flight(),
            "🛑 Initiating graceful shutdown"
        );

        self.shared.admitting.store(false, Ordering::SeqCst);
        let tasks = std::mem::take(&mut *self.tasks.lock());

        if let Some(ingestion) = tasks.ingestion {
            ingestion.abort();
            if let Err(e) = ingestion.await {
                if e.is_panic() {
                    log_error("ingestion", "shutdown", &e.to_string(), None);
                }
            }
        }

        let drained = self.drain().await;
        let remaining_in_queue = self.shared.queue.size();
        if !drained {
            warn!(
                remaining_in_queue = remaining_in_queue,
                in_flight = self.in_flight(),
                timeout_secs = self.config.drain_timeout_seconds,
                "⚠️ Drain timeout elapsed with work outstanding"
            );
        }

        self.shared.queue.close();
        for processor in tasks.processors {
            processor.abort();
            if let Err(e) = processor.await {
                if e.is_panic() {
                    log_error("processor", "shutdown", &e.to_string(), None);
                }
            }
        }
        if let Some(monitor) = tasks.monitor {
            monitor.abort();
        }

        let abandoned_in_flight = self.abandon_in_flight();

        self.orchestrator.cleanup_all().await;
        if let Err(e) = self.broker.disconnect().await {
            log_error("broker", "disconnect", &e.to_string(), None);
        }

        let stats = self.stats();
        info!(
            received = stats.counters.received,
            processed = stats.counters.processed,
            failed = stats.counters.failed,
            requeued = stats.counters.requeued,
            success_rate = %format!("{:.1}%", stats.success_rate),
            uptime_seconds = stats.uptime_seconds,
            "📊 Final worker statistics"
        );

        self.running.store(false, Ordering::SeqCst);
        self.shutting_down.store(false, Ordering::SeqCst);
        info!("👋 Message consumer worker stopped");

        Ok(ShutdownReport {
            drained,
            remaining_in_queue,
            abandoned_in_flight,
            stats,
        })
    }

    async fn drain(&self) -> bool {
        let deadline = Instant::now() + self.config.drain_timeout();
        let poll = self.config.drain_poll_interval();

        if !self.has_outstanding_work() {
            return true;
        }
        info!(
            queue_size = self.shared.queue.size(),
            in_flight = self.in_flight(),
            "⏳ Waiting for outstanding items"
        );

        loop {
            if !self.has_outstanding_work() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }

    /// Queue first: processors claim an item in `in_flight` before the queue
    /// lock is released, so an empty queue followed by an empty map means idle
    fn has_outstanding_work(&self) -> bool {
        !self.shared.queue.is_empty() || !self.shared.in_flight.is_empty()
    }

    fn abandon_in_flight(&self) -> usize {
        let abandoned: Vec<(String, (MessagePriority, u32))> = self
            .shared
            .in_flight
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        self.shared.in_flight.clear();

        for (item_id, (priority, retry_count)) in &abandoned {
            warn!(item_id = %item_id, "Abandoning in-flight item");
            self.shared.statuses.record(
                item_id,
                ItemState::Failed,
                *priority,
                *retry_count,
                Some(ABANDONED_AT_SHUTDOWN.to_string()),
            );
        }
        abandoned.len()
    }

    /// Start, wait for Ctrl+C or SIGTERM, then shut down
    pub async fn run_until_signal(&self) -> WorkerResult<ShutdownReport> {
        self.start().await?;
        shutdown_signal().await?;
        self.shutdown().await
    }
}

async fn shutdown_signal() -> WorkerResult<()> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .map_err(|e| WorkerError::signal(format!("Ctrl+C handler: {e}")))
    };

    #[cfg(unix)]
    let terminate = async {
        let mut stream = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(|e| WorkerError::signal(format!("SIGTERM handler: {e}")))?;
        stream.recv().await;
        Ok::<(), WorkerError>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<WorkerResult<()>>();

    tokio::select! {
        result = ctrl_c => {
            info!("Received Ctrl+C");
            result
        },
        result = terminate => {
            info!("Received SIGTERM");
            result
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(user_uuid: &str) -> BrokerMessage {
        BrokerMessage::new(
            "speech.created",
            json!({"speechDto": {"user_uuid": user_uuid, "original_text": "hi"}}),
        )
    }

    #[test]
    fn test_priority_classification() {
        assert_eq!(
            determine_priority(&message("user-PREMIUM-1"), "premium"),
            MessagePriority::High
        );
        assert_eq!(
            determine_priority(&message("user-1"), "premium"),
            MessagePriority::Normal
        );
        assert_eq!(
            determine_priority(&message("user-premium").with_retry_count(1), "premium"),
            MessagePriority::Low
        );
        assert_eq!(
            determine_priority(&message("anyone"), ""),
            MessagePriority::Normal
        );
    }

    #[test]
    fn test_priority_without_speech_dto() {
        let bare = BrokerMessage::new("speech.created", json!({}));
        assert_eq!(determine_priority(&bare, "premium"), MessagePriority::Normal);
    }
}
