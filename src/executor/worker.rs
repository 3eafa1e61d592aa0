// worker thread stuff
use super::lifecycle::Shared;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub type WorkerId = usize;

// stats for each worker
#[derive(Debug, Default)]
pub struct WorkerState {
    pub tasks_executed: AtomicU64,
    pub busy_time_ns: AtomicU64,
    pub idle_time_ns: AtomicU64,
}

impl WorkerState {
    pub fn snapshot(&self, id: WorkerId) -> WorkerStats {
        WorkerStats {
            id,
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
            idle_time_ns: self.idle_time_ns.load(Ordering::Relaxed),
        }
    }
}

/// Per-worker counters at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub id: WorkerId,
    pub tasks_executed: u64,
    pub busy_time_ns: u64,
    pub idle_time_ns: u64,
}

impl WorkerStats {
    pub fn utilization(&self) -> f64 {
        let total = self.idle_time_ns + self.busy_time_ns;
        if total == 0 {
            return 0.0;
        }
        self.busy_time_ns as f64 / total as f64
    }
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub state: Arc<WorkerState>,
    shared: Arc<Shared>,
}

impl Worker {
    pub fn new(id: WorkerId, shared: Arc<Shared>) -> Self {
        Self {
            id,
            state: Arc::new(WorkerState::default()),
            shared,
        }
    }

    // main loop: one unit at a time until the pool stops
    pub fn run(self) {
        self.shared.register_worker_thread();
        tracing::debug!(worker = self.id, pool = self.shared.id, "worker started");

        loop {
            let idle_start = Instant::now();
            let Some(task) = self.shared.next_task() else {
                break;
            };
            self.state
                .idle_time_ns
                .fetch_add(idle_start.elapsed().as_nanos() as u64, Ordering::Relaxed);

            let id = task.id;
            let start = Instant::now();
            // failures are counted by the handler
            let _ = self.shared.panic_handler.execute(task);
            let run_ns = start.elapsed().as_nanos() as u64;

            self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
            self.state.busy_time_ns.fetch_add(run_ns, Ordering::Relaxed);
            self.shared.metrics.record_completion(run_ns);

            // last: may be what lets a shutdown caller return
            self.shared.complete(id);
        }

        tracing::debug!(worker = self.id, pool = self.shared.id, "worker exiting");
    }
}
