//! Pool state shared between the handle and its workers.
//!
//! Queues, the in-flight set, the streak counter and the lifecycle state all
//! live under one mutex, so "queues empty", "nothing in flight" and "state is
//! Draining" are always observed together.

use super::panic_handler::PanicHandler;
use super::task::{Task, TaskId};
use crate::scheduler::{Priority, PriorityQueues, Scheduler};
use crate::telemetry::Metrics;
use parking_lot::{Condvar, Mutex};
use std::cell::Cell;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // id of the pool whose worker runs on this thread, if any
    static CURRENT_POOL: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Lifecycle of a pool. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PoolState {
    /// Submissions are queued.
    Accepting,
    /// Shutdown requested; queued and running work is still being finished.
    Draining,
    /// Nothing queued, nothing in flight, workers are exiting.
    Stopped,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Accepting => "accepting",
            PoolState::Draining => "draining",
            PoolState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) state: PoolState,
    pub(crate) queues: PriorityQueues,
    pub(crate) scheduler: Scheduler,
    pub(crate) in_flight: HashSet<TaskId>,
}

impl Inner {
    fn is_idle(&self) -> bool {
        self.queues.is_empty() && self.in_flight.is_empty()
    }
}

pub(crate) struct Shared {
    pub(crate) id: u64,
    pub(crate) capacity: usize,
    pub(crate) inner: Mutex<Inner>,
    // workers park here while no unit is eligible
    pub(crate) work_available: Condvar,
    // shutdown callers park here until Stopped
    pub(crate) terminated: Condvar,
    pub(crate) panic_handler: PanicHandler,
    pub(crate) metrics: Metrics,
}

impl Shared {
    pub fn new(
        capacity: usize,
        high_streak_limit: usize,
        panic_handler: PanicHandler,
    ) -> Self {
        Self {
            id: POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            capacity,
            inner: Mutex::new(Inner {
                state: PoolState::Accepting,
                queues: PriorityQueues::new(),
                scheduler: Scheduler::new(high_streak_limit),
                in_flight: HashSet::with_capacity(capacity),
            }),
            work_available: Condvar::new(),
            terminated: Condvar::new(),
            panic_handler,
            metrics: Metrics::new(),
        }
    }

    /// Queue a task unless admission is closed. Never waits for capacity.
    pub fn enqueue(&self, task: Task) -> bool {
        let (id, priority) = (task.id, task.priority);

        let mut inner = self.inner.lock();
        if inner.state != PoolState::Accepting {
            drop(inner);
            self.metrics.record_rejected();
            tracing::trace!(task = %id, %priority, "rejected, pool is shutting down");
            return false;
        }
        inner.queues.push(task);
        drop(inner);

        self.metrics.record_submitted();
        self.work_available.notify_one();
        tracing::trace!(task = %id, %priority, "enqueued");
        true
    }

    /// Block until the scheduler hands out a unit, or return `None` once the
    /// pool has stopped. The returned task is already in the in-flight set.
    pub fn next_task(&self) -> Option<Task> {
        let mut inner = self.inner.lock();
        loop {
            let guard = &mut *inner;
            if let Some(task) = guard.scheduler.next(&mut guard.queues) {
                guard.in_flight.insert(task.id);
                let in_flight = guard.in_flight.len();
                debug_assert!(in_flight <= self.capacity);
                drop(inner);

                let wait_ns = task.enqueue_time.elapsed().as_nanos() as u64;
                self.metrics.record_dispatch(task.priority, wait_ns, in_flight);
                tracing::trace!(task = %task.id, priority = %task.priority, in_flight, "dispatched");
                return Some(task);
            }

            if inner.state == PoolState::Stopped {
                return None;
            }

            self.work_available.wait(&mut inner);
        }
    }

    /// Take a finished unit out of the in-flight set.
    pub fn complete(&self, id: TaskId) {
        let mut inner = self.inner.lock();
        inner.in_flight.remove(&id);
        if inner.state == PoolState::Draining && inner.is_idle() {
            self.finish(&mut inner);
        }
    }

    /// Close admission. Returns `true` only for the call that performed the
    /// Accepting -> Draining transition.
    pub fn begin_drain(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != PoolState::Accepting {
            return false;
        }
        inner.state = PoolState::Draining;
        if inner.is_idle() {
            self.finish(&mut inner);
        }
        true
    }

    /// Wait for the Stopped state, optionally until `deadline`.
    pub fn wait_stopped(&self, deadline: Option<Instant>) -> bool {
        let mut inner = self.inner.lock();
        while inner.state != PoolState::Stopped {
            match deadline {
                None => self.terminated.wait(&mut inner),
                Some(deadline) => {
                    if self.terminated.wait_until(&mut inner, deadline).timed_out() {
                        return inner.state == PoolState::Stopped;
                    }
                }
            }
        }
        true
    }

    fn finish(&self, inner: &mut Inner) {
        inner.state = PoolState::Stopped;
        self.terminated.notify_all();
        self.work_available.notify_all();
    }

    pub fn state(&self) -> PoolState {
        self.inner.lock().state
    }

    pub fn queued(&self, priority: Priority) -> usize {
        self.inner.lock().queues.len(priority)
    }

    pub fn queued_total(&self) -> usize {
        self.inner.lock().queues.total()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    /// Mark the calling thread as a worker of this pool.
    pub fn register_worker_thread(&self) {
        CURRENT_POOL.with(|current| current.set(Some(self.id)));
    }

    pub fn on_worker_thread(&self) -> bool {
        CURRENT_POOL.with(|current| current.get() == Some(self.id))
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(capacity: usize) -> Shared {
        Shared::new(capacity, 3, PanicHandler::default())
    }

    fn task(priority: Priority) -> Task {
        Task::new(Box::new(|| {}), priority)
    }

    #[test]
    fn test_state_ordering() {
        assert!(PoolState::Accepting < PoolState::Draining);
        assert!(PoolState::Draining < PoolState::Stopped);
        assert_eq!(PoolState::Draining.to_string(), "draining");
    }

    #[test]
    fn test_enqueue_then_dispatch_tracks_in_flight() {
        let shared = shared(2);
        assert!(shared.enqueue(task(Priority::Normal)));
        assert_eq!(shared.queued(Priority::Normal), 1);

        let task = shared.next_task().unwrap();
        assert_eq!(shared.queued_total(), 0);
        assert_eq!(shared.in_flight(), 1);

        shared.complete(task.id);
        assert_eq!(shared.in_flight(), 0);
    }

    #[test]
    fn test_idle_drain_stops_immediately() {
        let shared = shared(1);
        assert!(shared.begin_drain());
        assert_eq!(shared.state(), PoolState::Stopped);
        assert!(!shared.begin_drain());
        assert!(shared.next_task().is_none());
    }

    #[test]
    fn test_drain_keeps_queued_work() {
        let shared = shared(1);
        assert!(shared.enqueue(task(Priority::Low)));
        assert!(shared.begin_drain());

        assert_eq!(shared.state(), PoolState::Draining);
        assert!(!shared.enqueue(task(Priority::High)));
        assert_eq!(shared.queued_total(), 1);

        let task = shared.next_task().unwrap();
        assert_eq!(shared.state(), PoolState::Draining);
        shared.complete(task.id);

        assert_eq!(shared.state(), PoolState::Stopped);
        assert!(shared.wait_stopped(None));
    }

    #[test]
    fn test_wait_stopped_times_out() {
        let shared = shared(1);
        assert!(shared.enqueue(task(Priority::Normal)));
        shared.begin_drain();

        let deadline = Instant::now() + std::time::Duration::from_millis(20);
        assert!(!shared.wait_stopped(Some(deadline)));
    }

    #[test]
    fn test_worker_thread_registration() {
        let shared = shared(1);
        assert!(!shared.on_worker_thread());
        shared.register_worker_thread();
        assert!(shared.on_worker_thread());

        let other = self::shared(1);
        assert!(!other.on_worker_thread());
    }
}
