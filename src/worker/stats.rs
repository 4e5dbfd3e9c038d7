//! Worker counters behind a single lock.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::queue::QueueStats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCounters {
    /// Messages handed over by the broker while admissions were open
    pub received: u64,
    pub processed: u64,
    /// Admission refusals plus permanently failed items
    pub failed: u64,
    pub requeued: u64,
}

impl WorkerCounters {
    /// Percentage of received messages that completed successfully
    pub fn success_rate(&self) -> f64 {
        if self.received == 0 {
            return 0.0;
        }
        self.processed as f64 / self.received as f64 * 100.0
    }
}

#[derive(Debug, Default)]
struct StatsState {
    counters: WorkerCounters,
    started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct WorkerStats {
    state: Mutex<StatsState>,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_started(&self) {
        self.state.lock().started_at = Some(Utc::now());
    }

    pub fn record_received(&self) {
        self.state.lock().counters.received += 1;
    }

    pub fn record_processed(&self) {
        self.state.lock().counters.processed += 1;
    }

    pub fn record_failed(&self) {
        self.state.lock().counters.failed += 1;
    }

    pub fn record_requeued(&self) {
        self.state.lock().counters.requeued += 1;
    }

    pub fn counters(&self) -> WorkerCounters {
        self.state.lock().counters
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().started_at
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started_at()
            .map(|started| (Utc::now() - started).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0)
    }

    pub fn snapshot(&self, active_processors: usize, queue: QueueStats) -> WorkerStatsSnapshot {
        let state = self.state.lock();
        let uptime_seconds = state
            .started_at
            .map(|started| (Utc::now() - started).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);
        WorkerStatsSnapshot {
            counters: state.counters,
            success_rate: state.counters.success_rate(),
            started_at: state.started_at,
            uptime_seconds,
            active_processors,
            queue,
        }
    }
}

/// Point-in-time view of the worker and its queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatsSnapshot {
    pub counters: WorkerCounters,
    pub success_rate: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_seconds: f64,
    pub active_processors: usize,
    pub queue: QueueStats,
}
