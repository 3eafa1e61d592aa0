//! Pool telemetry.
//!
//! With the `telemetry` feature (on by default) the pool keeps admission and
//! execution counters plus queue-wait and run-time histograms. Without it a
//! no-op collector with the same API is compiled in.

use std::time::Duration;

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub use metrics::Metrics;

/// Snapshot of pool metrics at a point in time
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub tasks_submitted: u64,
    pub tasks_rejected: u64,
    pub tasks_executed: u64,
    pub tasks_failed: u64,
    pub dispatched_high: u64,
    pub dispatched_normal: u64,
    pub dispatched_low: u64,
    pub peak_in_flight: usize,
    pub avg_queue_wait_ns: u64,
    pub p99_queue_wait_ns: u64,
    pub avg_run_ns: u64,
    pub p50_run_ns: u64,
    pub p99_run_ns: u64,
    pub max_run_ns: u64,
}

impl MetricsSnapshot {
    /// Fraction of executed units that failed (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        if self.tasks_executed == 0 {
            return 0.0;
        }
        self.tasks_failed as f64 / self.tasks_executed as f64
    }

    /// Completed units per second of pool uptime
    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.tasks_executed as f64 / seconds
    }
}

// Stub implementation when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use super::MetricsSnapshot;
    use crate::scheduler::Priority;

    #[derive(Debug, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self { Self }
        pub fn record_submitted(&self) {}
        pub fn record_rejected(&self) {}
        pub fn record_dispatch(&self, _: Priority, _: u64, _: usize) {}
        pub fn record_completion(&self, _: u64) {}
        pub fn snapshot(&self) -> MetricsSnapshot { MetricsSnapshot::default() }
    }
}

#[cfg(not(feature = "telemetry"))]
pub use metrics::Metrics;
