//! Connection metrics tracking and monitoring

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Tracks call metrics for one peer connection
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    /// Total send attempts
    calls: AtomicU64,
    /// Sends that ended in an error
    failures: AtomicU64,
    /// Sends that ended in a timeout
    timeouts: AtomicU64,
    /// Latency of the most recent send
    last_latency_ms: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, duration: Duration) {
        self.last_latency_ms
            .store(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self, error: &str, timed_out: bool) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(error.to_string());
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            calls: self.calls(),
            failures: self.failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            last_latency_ms: self.last_latency_ms.load(Ordering::Relaxed),
            last_error: self.last_error.lock().ok().and_then(|e| e.clone()),
        }
    }
}

/// Connection statistics at a point in time
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectionStats {
    pub calls: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub last_latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_tracking() {
        let metrics = ConnectionMetrics::new();
        metrics.record_call();
        metrics.record_call();
        metrics.record_latency(Duration::from_millis(42));
        metrics.record_failure("timeout", true);

        let stats = metrics.snapshot();
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.last_latency_ms, 42);
        assert_eq!(stats.last_error.as_deref(), Some("timeout"));
    }
}
