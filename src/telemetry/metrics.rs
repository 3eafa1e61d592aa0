//! Metrics collection for pool monitoring.

use super::MetricsSnapshot;
use crate::scheduler::Priority;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

// one hour in nanoseconds
const MAX_TRACKED_NS: u64 = 3_600_000_000_000;

/// Pool metrics collector
#[derive(Debug)]
pub struct Metrics {
    // Admission counters
    tasks_submitted: AtomicU64,
    tasks_rejected: AtomicU64,

    // Execution counters
    tasks_executed: AtomicU64,
    dispatched: [AtomicU64; 3],
    peak_in_flight: AtomicUsize,

    // Time between submission and dispatch
    queue_wait: RwLock<Histogram<u64>>,
    // Time spent inside the unit's run
    run_time: RwLock<Histogram<u64>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_rejected: AtomicU64::new(0),
            tasks_executed: AtomicU64::new(0),
            dispatched: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
            peak_in_flight: AtomicUsize::new(0),
            queue_wait: RwLock::new(new_histogram()),
            run_time: RwLock::new(new_histogram()),
            start_time: Instant::now(),
        }
    }

    pub fn record_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.tasks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a unit leaving its queue after waiting `wait_ns`.
    pub fn record_dispatch(&self, priority: Priority, wait_ns: u64, in_flight: usize) {
        self.dispatched[priority.index()].fetch_add(1, Ordering::Relaxed);
        self.peak_in_flight.fetch_max(in_flight, Ordering::Relaxed);
        self.queue_wait.write().saturating_record(wait_ns);
    }

    /// Record a finished run, successful or not.
    pub fn record_completion(&self, run_ns: u64) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.run_time.write().saturating_record(run_ns);
    }

    /// Counters and histograms recorded so far. `tasks_failed` is left at
    /// zero; the pool fills it from its panic handler.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let wait = self.queue_wait.read();
        let run = self.run_time.read();

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_rejected: self.tasks_rejected.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_failed: 0,
            dispatched_high: self.dispatched[Priority::High.index()].load(Ordering::Relaxed),
            dispatched_normal: self.dispatched[Priority::Normal.index()].load(Ordering::Relaxed),
            dispatched_low: self.dispatched[Priority::Low.index()].load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
            avg_queue_wait_ns: mean(&wait),
            p99_queue_wait_ns: wait.value_at_quantile(0.99),
            avg_run_ns: mean(&run),
            p50_run_ns: run.value_at_quantile(0.50),
            p99_run_ns: run.value_at_quantile(0.99),
            max_run_ns: run.max(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn new_histogram() -> Histogram<u64> {
    // 3 significant figures, bounds are constant
    Histogram::new_with_max(MAX_TRACKED_NS, 3).expect("Failed to create histogram")
}

fn mean(hist: &Histogram<u64>) -> u64 {
    if hist.len() > 0 {
        hist.mean() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let metrics = Metrics::new();

        metrics.record_submitted();
        metrics.record_submitted();
        metrics.record_rejected();
        metrics.record_dispatch(Priority::High, 500, 1);
        metrics.record_dispatch(Priority::Low, 1500, 2);
        metrics.record_completion(1000);
        metrics.record_completion(3000);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_submitted, 2);
        assert_eq!(snapshot.tasks_rejected, 1);
        assert_eq!(snapshot.tasks_executed, 2);
        assert_eq!(snapshot.dispatched_high, 1);
        assert_eq!(snapshot.dispatched_normal, 0);
        assert_eq!(snapshot.dispatched_low, 1);
        assert_eq!(snapshot.peak_in_flight, 2);
        assert!(snapshot.avg_run_ns > 0);
        assert!(snapshot.avg_queue_wait_ns > 0);
        assert!(snapshot.max_run_ns >= 3000);
    }

    #[test]
    fn test_peak_in_flight_is_monotonic() {
        let metrics = Metrics::new();

        metrics.record_dispatch(Priority::Normal, 0, 3);
        metrics.record_dispatch(Priority::Normal, 0, 1);

        assert_eq!(metrics.snapshot().peak_in_flight, 3);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.tasks_executed, 0);
        assert_eq!(snapshot.avg_run_ns, 0);
        assert_eq!(snapshot.failure_rate(), 0.0);
    }
}
