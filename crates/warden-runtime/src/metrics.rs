//! Judge call metrics.
//!
//! Lock-free counters updated from every rule task; a report snapshot
//! derives success rate and average latency for operators.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::providers::ErrorKind;

/// Atomic counters for judge activity.
#[derive(Debug, Default)]
pub struct JudgeMetrics {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    retries: AtomicU64,
    timeouts: AtomicU64,
    rate_limits: AtomicU64,
    circuit_breaker_trips: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Snapshot of metrics with derived figures.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub retries: u64,
    pub timeouts: u64,
    pub rate_limits: u64,
    pub circuit_breaker_trips: u64,
    /// Mean latency of successful calls, e.g. "123.4ms".
    pub average_latency: String,
    /// Fraction of requests that succeeded, e.g. "95.0%".
    pub success_rate: String,
}

impl JudgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, latency_ms: u64) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_failure(&self, kind: ErrorKind) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        match kind {
            ErrorKind::Timeout => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
            }
            ErrorKind::RateLimit => {
                self.rate_limits.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trip(&self) {
        self.circuit_breaker_trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        let requests = self.requests.load(Ordering::Relaxed);
        let successes = self.successes.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);

        let average_latency = if successes > 0 {
            format!("{:.1}ms", total_latency_ms as f64 / successes as f64)
        } else {
            "0.0ms".to_string()
        };
        let success_rate = if requests > 0 {
            format!("{:.1}%", successes as f64 / requests as f64 * 100.0)
        } else {
            "0.0%".to_string()
        };

        MetricsReport {
            requests,
            successes,
            failures: self.failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            rate_limits: self.rate_limits.load(Ordering::Relaxed),
            circuit_breaker_trips: self.circuit_breaker_trips.load(Ordering::Relaxed),
            average_latency,
            success_rate,
        }
    }
}
