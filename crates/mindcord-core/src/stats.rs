//! Counters for the reactive path and the background loops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Reactive-path counters.
#[derive(Debug, Default)]
pub struct EngineStats {
    events_observed: AtomicU64,
    replies_sent: AtomicU64,
    fallback_replies: AtomicU64,
    generation_failures: AtomicU64,
    storage_failures: AtomicU64,
    events_dropped: AtomicU64,
    channel_workers: AtomicU64,
    last_latency_ms: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStatsSnapshot {
    pub events_observed: u64,
    pub replies_sent: u64,
    pub fallback_replies: u64,
    pub generation_failures: u64,
    pub storage_failures: u64,
    /// Events discarded because their channel's queue was full.
    pub events_dropped: u64,
    /// Channel workers currently alive.
    pub channel_workers: u64,
    /// Latency of the most recent successful generation call.
    pub last_latency_ms: u64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&self) {
        self.events_observed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reply(&self) {
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallback_replies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generation_failure(&self) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_storage_failure(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_event(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_started(&self) {
        self.channel_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_stopped(&self) {
        self.channel_workers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, latency: std::time::Duration) {
        self.last_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            events_observed: self.events_observed.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            fallback_replies: self.fallback_replies.load(Ordering::Relaxed),
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            channel_workers: self.channel_workers.load(Ordering::Relaxed),
            last_latency_ms: self.last_latency_ms.load(Ordering::Relaxed),
        }
    }
}

/// Counters for one background loop.
#[derive(Debug, Default)]
pub struct LoopStats {
    runs: AtomicU64,
    failures: AtomicU64,
    last_error: Mutex<Option<String>>,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`LoopStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopStatsSnapshot {
    pub runs: u64,
    pub failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
}

impl LoopStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed iteration.
    pub fn record_success(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        *self.last_run.lock().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
    }

    /// Record a failed iteration. The loop keeps running.
    pub fn record_failure(&self, error: impl ToString) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(error.to_string());
        *self.last_run.lock().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
    }

    pub fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
            last_run: *self.last_run.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_stats_count_failures_and_keep_last_error() {
        let stats = LoopStats::new();
        stats.record_success();
        stats.record_failure("disk full");
        stats.record_failure("disk still full");

        let snap = stats.snapshot();
        assert_eq!(snap.runs, 3);
        assert_eq!(snap.failures, 2);
        assert_eq!(snap.last_error.as_deref(), Some("disk still full"));
        assert!(snap.last_run.is_some());
    }

    #[test]
    fn test_engine_stats_snapshot() {
        let stats = EngineStats::new();
        stats.record_event();
        stats.record_event();
        stats.record_reply();
        stats.record_latency(std::time::Duration::from_millis(1234));
        stats.record_dropped_event();
        stats.worker_started();
        stats.worker_started();
        stats.worker_stopped();

        let snap = stats.snapshot();
        assert_eq!(snap.events_observed, 2);
        assert_eq!(snap.events_dropped, 1);
        assert_eq!(snap.channel_workers, 1);
        assert_eq!(snap.replies_sent, 1);
        assert_eq!(snap.last_latency_ms, 1234);
    }
}
