//! # Processing Queue
//!
//! Bounded, priority-bucketed FIFO sitting between the broker consumer and the
//! processing tasks.
//!
//! ## Ordering
//!
//! Each priority owns a FIFO bucket. `dequeue` always serves the highest-priority
//! non-empty bucket, and within a bucket the item that was (re)enqueued first.
//! A requeued item goes to the tail of its (possibly demoted) bucket.
//!
//! ## Concurrency
//!
//! All buckets and counters sit behind one lock. Waiting dequeuers park on a
//! `Notify` woken by every successful admission and by `close`.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::item::QueuedItem;
use super::priority::MessagePriority;
use super::stats::{PriorityCounts, QueueStats};
use crate::config::QueueConfig;
use crate::models::Payload;

#[derive(Debug, Default)]
struct QueueState {
    buckets: [VecDeque<QueuedItem>; 4],
    total_enqueued: u64,
    total_processed: u64,
    total_failed: u64,
}

impl QueueState {
    fn len(&self) -> usize {
        self.buckets.iter().map(VecDeque::len).sum()
    }

    fn front(&self) -> Option<&QueuedItem> {
        self.buckets.iter().find_map(VecDeque::front)
    }

    fn pop_next(&mut self) -> Option<QueuedItem> {
        self.buckets.iter_mut().find_map(VecDeque::pop_front)
    }
}

/// Priority queue shared by the ingestion task and the processing tasks
#[derive(Debug)]
pub struct ProcessingQueue {
    state: Mutex<QueueState>,
    /// 0 means unbounded
    max_size: usize,
    max_retries: u32,
    available: Notify,
    closed: AtomicBool,
}

impl ProcessingQueue {
    pub fn new(max_size: usize, max_retries: u32) -> Self {
        info!(
            max_size = max_size,
            max_retries = max_retries,
            "📋 Processing queue initialized"
        );
        Self {
            state: Mutex::new(QueueState::default()),
            max_size,
            max_retries,
            available: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.max_size, config.max_retries)
    }

    /// Append a new item to the tail of its priority bucket.
    ///
    /// Returns false, leaving the queue untouched, when full or closed.
    pub fn enqueue(&self, payload: Payload, priority: MessagePriority) -> bool {
        if self.is_closed() {
            debug!("Rejecting enqueue: queue is closed");
            return false;
        }

        let mut state = self.state.lock();
        if self.at_capacity(&state) {
            warn!(
                current_size = state.len(),
                max_size = self.max_size,
                "⚠️ Processing queue full, rejecting item"
            );
            return false;
        }

        let item = QueuedItem::new(payload, priority, self.max_retries);
        debug!(item_id = %item.id, priority = %priority, "Item enqueued");
        state.buckets[priority.index()].push_back(item);
        state.total_enqueued += 1;
        drop(state);

        self.available.notify_one();
        true
    }

    /// Remove the next item, waiting until one is available.
    ///
    /// Returns `None` once the queue is closed and empty.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use speechflow_core::queue::{MessagePriority, ProcessingQueue};
    ///
    /// # tokio_test::block_on(async {
    /// let queue = ProcessingQueue::new(0, 3);
    /// let payload = json!({"id": "msg-1"}).as_object().cloned().unwrap();
    /// queue.enqueue(payload, MessagePriority::High);
    /// queue.close();
    ///
    /// assert_eq!(queue.dequeue().await.map(|item| item.id), Some("msg-1".to_string()));
    /// assert!(queue.dequeue().await.is_none());
    /// # });
    /// ```
    pub async fn dequeue(&self) -> Option<QueuedItem> {
        self.dequeue_with(|_| {}).await
    }

    /// Like `dequeue`, running `on_take` on the item before the queue lock is
    /// released
    pub async fn dequeue_with<F>(&self, mut on_take: F) -> Option<QueuedItem>
    where
        F: FnMut(&QueuedItem),
    {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent enqueue cannot be missed
            notified.as_mut().enable();

            if let Some(item) = self.try_dequeue_with(&mut on_take) {
                return Some(item);
            }
            if self.is_closed() {
                return None;
            }

            notified.await;
        }
    }

    /// Like `dequeue`, but gives up after `timeout`
    pub async fn dequeue_timeout(&self, timeout: Duration) -> Option<QueuedItem> {
        self.dequeue_timeout_with(timeout, |_| {}).await
    }

    pub async fn dequeue_timeout_with<F>(
        &self,
        timeout: Duration,
        on_take: F,
    ) -> Option<QueuedItem>
    where
        F: FnMut(&QueuedItem),
    {
        tokio::time::timeout(timeout, self.dequeue_with(on_take))
            .await
            .ok()
            .flatten()
    }

    /// Remove the next item without waiting
    pub fn try_dequeue(&self) -> Option<QueuedItem> {
        self.try_dequeue_with(|_| {})
    }

    /// Like `try_dequeue`; `on_take` runs while the lock is still held, so the
    /// item is claimed before any other caller can see the queue without it
    pub fn try_dequeue_with<F>(&self, on_take: F) -> Option<QueuedItem>
    where
        F: FnOnce(&QueuedItem),
    {
        let mut state = self.state.lock();
        let item = state.pop_next()?;
        state.total_processed += 1;
        on_take(&item);
        Some(item)
    }

    /// The item `dequeue` would return next, without removing it
    pub fn peek(&self) -> Option<QueuedItem> {
        self.state.lock().front().cloned()
    }

    /// Put a failed item back for another attempt.
    ///
    /// Increments `retry_count`. Once the budget is exhausted the item is dropped
    /// and counted as failed. Otherwise the item is re-stamped, demoted to `Low`
    /// from its second retry on, and appended to its bucket. Returns false when
    /// the item was not re-admitted; every refusal counts as failed.
    pub fn requeue(&self, mut item: QueuedItem) -> bool {
        if !item.increment_retry() {
            self.state.lock().total_failed += 1;
            warn!(
                item_id = %item.id,
                retry_count = item.retry_count,
                max_retries = item.max_retries,
                "❌ Item exceeded max retries, dropping"
            );
            return false;
        }

        if self.is_closed() {
            self.state.lock().total_failed += 1;
            debug!(item_id = %item.id, "Rejecting requeue: queue is closed");
            return false;
        }

        item.enqueued_at = Utc::now();
        if item.retry_count > 1 {
            item.priority = MessagePriority::Low;
        }

        let mut state = self.state.lock();
        if self.at_capacity(&state) {
            state.total_failed += 1;
            warn!(item_id = %item.id, "⚠️ Processing queue full, cannot requeue item");
            return false;
        }

        info!(
            item_id = %item.id,
            retry_count = item.retry_count,
            priority = %item.priority,
            "🔄 Item requeued"
        );
        state.buckets[item.priority.index()].push_back(item);
        drop(state);

        self.available.notify_one();
        true
    }

    pub fn size(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn is_full(&self) -> bool {
        self.at_capacity(&self.state.lock())
    }

    /// Configured capacity, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        (self.max_size > 0).then_some(self.max_size)
    }

    /// Drop every queued item, returning how many were removed
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let removed = state.len();
        state.buckets.iter_mut().for_each(VecDeque::clear);
        info!(removed = removed, "🧹 Processing queue cleared");
        removed
    }

    /// Stop admitting items and wake every waiting dequeuer.
    ///
    /// Items already queued can still be dequeued.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(remaining = self.size(), "🔒 Processing queue closed");
        }
        self.available.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn get_stats(&self) -> QueueStats {
        let state = self.state.lock();
        let now = Utc::now();
        let current_size = state.len();

        let mut messages_by_priority = PriorityCounts::default();
        for priority in MessagePriority::ALL {
            messages_by_priority.set(priority, state.buckets[priority.index()].len());
        }

        let total_wait: f64 = state
            .buckets
            .iter()
            .flatten()
            .map(|item| item.wait_time(now).num_milliseconds() as f64 / 1000.0)
            .sum();
        let avg_wait_time_seconds = if current_size > 0 {
            total_wait / current_size as f64
        } else {
            0.0
        };

        QueueStats {
            current_size,
            max_size: self.capacity(),
            is_empty: current_size == 0,
            is_full: self.at_capacity(&state),
            is_closed: self.is_closed(),
            total_enqueued: state.total_enqueued,
            total_processed: state.total_processed,
            total_failed: state.total_failed,
            messages_by_priority,
            avg_wait_time_seconds,
        }
    }

    /// Snapshot of one bucket, oldest first
    pub fn get_messages_by_priority(&self, priority: MessagePriority) -> Vec<QueuedItem> {
        let mut items: Vec<QueuedItem> = self.state.lock().buckets[priority.index()]
            .iter()
            .cloned()
            .collect();
        items.sort_by_key(|item| item.enqueued_at);
        items
    }

    fn at_capacity(&self, state: &QueueState) -> bool {
        self.max_size > 0 && state.len() >= self.max_size
    }
}
