//! Query counters owned by the server state. Nothing is persisted across restarts.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use hkrag_pipeline::format::round2;

#[derive(Debug)]
pub struct Metrics {
    total_queries: AtomicU64,
    total_errors: AtomicU64,
    latency_micros: AtomicU64,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub total_errors: u64,
    pub average_latency_seconds: f64,
    pub uptime_since: String,
    /// Percentage of queries that failed.
    pub error_rate: f64,
}

impl Default for Metrics {
    fn default() -> Self { Self::new() }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_queries: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            latency_micros: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_success(&self, latency: Duration) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        self.latency_micros.fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Zero the counters; the start time is kept.
    pub fn reset(&self) {
        self.total_queries.store(0, Ordering::Relaxed);
        self.total_errors.store(0, Ordering::Relaxed);
        self.latency_micros.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_queries.load(Ordering::Relaxed);
        let errors = self.total_errors.load(Ordering::Relaxed);
        let latency = self.latency_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        let (average, rate) = if total == 0 {
            (0.0, 0.0)
        } else {
            (latency / total as f64, errors as f64 / total as f64 * 100.0)
        };
        MetricsSnapshot {
            total_queries: total,
            total_errors: errors,
            average_latency_seconds: round2(average),
            uptime_since: self.started_at.to_rfc3339(),
            error_rate: round2(rate),
        }
    }
}
