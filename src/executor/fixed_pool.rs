use super::lifecycle::{PoolState, Shared};
use super::panic_handler::PanicHandler;
use super::task::{Task, UnitOfWork};
use super::worker::{Worker, WorkerId, WorkerState, WorkerStats};
use crate::config::{Capacity, Config};
use crate::error::{Error, Result};
use crate::scheduler::Priority;
use crate::telemetry::MetricsSnapshot;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[cfg(target_os = "linux")]
fn pin_thread_to_core(core_id: usize) {
    let core_id = core_id % num_cpus::get().max(1);
    // SAFETY: cpuset is a plain bitmask owned by this frame; pid 0 targets
    // the calling thread.
    let result = unsafe {
        let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core_id, &mut cpuset);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &cpuset)
    };
    if result != 0 {
        tracing::warn!(
            thread = thread::current().name().unwrap_or("unknown"),
            core_id,
            "failed to pin worker thread"
        );
    }
}

/// A fixed-size thread pool with three priority lanes.
///
/// Exactly `capacity` worker threads pull units of work from the High,
/// Normal and Low lanes. At most three High units (by default) are
/// dispatched in a row while Normal work is waiting, and Low work only runs
/// when the other two lanes are empty.
///
/// [`submit`](Self::submit) never blocks. [`shutdown`](Self::shutdown)
/// closes admission and waits until every accepted unit has run; queued
/// work is never discarded.
///
/// ```no_run
/// use fixed_pool::{FixedPool, Priority};
///
/// let pool = FixedPool::new(4)?;
/// pool.submit(|| println!("urgent"), Priority::High);
/// pool.submit(|| println!("whenever"), Priority::Low);
/// pool.shutdown();
/// assert!(!pool.submit(|| {}, Priority::High));
/// # Ok::<(), fixed_pool::Error>(())
/// ```
pub struct FixedPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<WorkerHandle>>,
    worker_states: Vec<Arc<WorkerState>>,
}

struct WorkerHandle {
    id: WorkerId,
    thread: JoinHandle<()>,
}

impl FixedPool {
    /// Create a pool with `capacity` workers and default settings.
    ///
    /// Accepts anything convertible to a [`Capacity`], signed counts
    /// included. Fails with [`Error::InvalidConfiguration`] when `capacity`
    /// is zero, negative or above [`MAX_CAPACITY`](crate::config::MAX_CAPACITY).
    pub fn new<C>(capacity: C) -> Result<Self>
    where
        C: TryInto<Capacity, Error = Error>,
    {
        let capacity = capacity.try_into()?;
        let config = Config::builder().capacity(capacity.get()).build()?;
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let capacity = config.worker_threads();

        let shared = Arc::new(Shared::new(
            capacity,
            config.high_streak_limit,
            PanicHandler::new(config.panic_strategy),
        ));

        let mut handles = Vec::with_capacity(capacity);
        let mut worker_states = Vec::with_capacity(capacity);

        for id in 0..capacity {
            let worker = Worker::new(id, shared.clone());
            let state = worker.state.clone();
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let pin_workers = config.pin_workers;
            let spawned = builder.spawn(move || {
                #[cfg(target_os = "linux")]
                if pin_workers {
                    pin_thread_to_core(id);
                }
                #[cfg(not(target_os = "linux"))]
                let _ = pin_workers;

                worker.run();
            });

            match spawned {
                Ok(thread) => {
                    handles.push(WorkerHandle { id, thread });
                    worker_states.push(state);
                }
                Err(err) => {
                    tracing::error!(worker = id, error = %err, "failed to spawn worker");
                    // nothing was submitted yet, so this stops immediately
                    shared.begin_drain();
                    for handle in handles {
                        let _ = handle.thread.join();
                    }
                    return Err(Error::Spawn(err));
                }
            }
        }

        tracing::debug!(pool = shared.id, capacity, "pool started");

        Ok(Self {
            shared,
            workers: Mutex::new(handles),
            worker_states,
        })
    }

    /// Queue `unit` on the `priority` lane.
    ///
    /// Returns `true` once queued, without waiting for a free worker, and
    /// `false` with no side effect after [`shutdown`](Self::shutdown) has
    /// been called.
    pub fn submit<U>(&self, unit: U, priority: Priority) -> bool
    where
        U: UnitOfWork,
    {
        self.submit_boxed(Box::new(unit), priority)
    }

    pub fn submit_boxed(&self, unit: Box<dyn UnitOfWork>, priority: Priority) -> bool {
        self.shared.enqueue(Task::new(unit, priority))
    }

    /// Like [`submit_boxed`](Self::submit_boxed) for callers holding an
    /// optional unit; `None` fails with [`Error::InvalidArgument`] and
    /// leaves the pool untouched.
    pub fn try_submit(
        &self,
        unit: Option<Box<dyn UnitOfWork>>,
        priority: Priority,
    ) -> Result<bool> {
        let unit = unit.ok_or_else(|| Error::argument("unit of work is missing"))?;
        Ok(self.submit_boxed(unit, priority))
    }

    /// Submit a closure on the Normal lane.
    pub fn execute<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(f, Priority::Normal)
    }

    /// Stop accepting work and block until everything already accepted has
    /// run. Later and concurrent calls return immediately.
    ///
    /// Called from a unit running on this pool, admission is closed but the
    /// call does not wait; the pool stops once the remaining work finishes.
    pub fn shutdown(&self) {
        if !self.shared.begin_drain() {
            return;
        }

        tracing::info!(
            pool = self.shared.id,
            queued = self.shared.queued_total(),
            in_flight = self.shared.in_flight(),
            "shutdown requested, draining"
        );

        if self.shared.on_worker_thread() {
            tracing::warn!(
                pool = self.shared.id,
                "shutdown called from a worker of this pool, not waiting for drain"
            );
            return;
        }

        self.shared.wait_stopped(None);
        self.join_workers();

        tracing::info!(pool = self.shared.id, "pool stopped");
    }

    /// Wait up to `timeout` for the pool to reach [`PoolState::Stopped`].
    ///
    /// Does not initiate shutdown. Returns whether the pool stopped. A
    /// timeout too large to represent as a deadline waits without bound.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        self.shared.wait_stopped(Instant::now().checked_add(timeout))
    }

    fn join_workers(&self) {
        // a worker joining its siblings would wait on its own in-flight unit
        if self.shared.on_worker_thread() {
            return;
        }

        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if handle.thread.join().is_err() {
                tracing::error!(worker = handle.id, "worker thread panicked");
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    /// True once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.state() != PoolState::Accepting
    }

    /// True once all accepted work has finished.
    pub fn is_terminated(&self) -> bool {
        self.state() == PoolState::Stopped
    }

    pub fn queued(&self, priority: Priority) -> usize {
        self.shared.queued(priority)
    }

    pub fn queued_total(&self) -> usize {
        self.shared.queued_total()
    }

    pub fn in_flight(&self) -> usize {
        self.shared.in_flight()
    }

    /// Units that returned an error or panicked so far.
    pub fn failure_count(&self) -> usize {
        self.shared.panic_handler.failure_count()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_failed: self.failure_count() as u64,
            ..self.shared.metrics.snapshot()
        }
    }

    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.worker_states
            .iter()
            .enumerate()
            .map(|(id, state)| state.snapshot(id))
            .collect()
    }
}

impl fmt::Debug for FixedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedPool")
            .field("shared", &self.shared)
            .field("queued", &self.queued_total())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl Drop for FixedPool {
    fn drop(&mut self) {
        self.shutdown();
        self.join_workers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_capacity_fails() {
        assert!(matches!(
            FixedPool::new(0),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_signed_capacity() {
        assert!(matches!(
            FixedPool::new(-1i64),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            FixedPool::new(-4i32),
            Err(Error::InvalidConfiguration(_))
        ));

        let pool = FixedPool::new(2i64).unwrap();
        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn test_await_termination_unbounded_timeout() {
        let pool = FixedPool::new(1).unwrap();
        pool.shutdown();
        assert!(pool.await_termination(Duration::MAX));
    }

    #[test]
    fn test_basic_lifecycle() {
        let pool = FixedPool::new(3).unwrap();
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.state(), PoolState::Accepting);
        assert_eq!(pool.worker_stats().len(), 3);

        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..20 {
            let counter = counter.clone();
            assert!(pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        assert!(pool.is_shutdown());
        assert!(pool.is_terminated());
        assert_eq!(pool.queued_total(), 0);
        assert_eq!(pool.in_flight(), 0);

        let executed: u64 = pool.worker_stats().iter().map(|s| s.tasks_executed).sum();
        assert_eq!(executed, 20);
    }

    #[test]
    fn test_try_submit_none_is_invalid_argument() {
        let pool = FixedPool::new(1).unwrap();
        assert!(matches!(
            pool.try_submit(None, Priority::High),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(pool.queued_total(), 0);
        assert_eq!(pool.state(), PoolState::Accepting);

        let unit: Box<dyn UnitOfWork> = Box::new(|| {});
        assert!(pool.try_submit(Some(unit), Priority::High).unwrap());
    }

    #[test]
    fn test_shutdown_from_inside_a_unit() {
        let pool = Arc::new(FixedPool::new(2).unwrap());
        let ran = Arc::new(AtomicUsize::new(0));

        let inner_pool = pool.clone();
        let inner_ran = ran.clone();
        assert!(pool.submit(
            move || {
                inner_pool.shutdown();
                assert!(!inner_pool.execute(|| {}));
                inner_ran.fetch_add(1, Ordering::SeqCst);
            },
            Priority::High,
        ));

        assert!(pool.await_termination(Duration::from_secs(5)));
        assert_eq!(ran.load(Ordering::SeqCst), 1);

        // idempotent, joins the workers
        pool.shutdown();
        drop(pool);
    }

    #[test]
    fn test_drop_drains_queue() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = FixedPool::new(1).unwrap();
            for _ in 0..5 {
                let counter = counter.clone();
                pool.submit(
                    move || {
                        thread::sleep(Duration::from_millis(2));
                        counter.fetch_add(1, Ordering::SeqCst);
                    },
                    Priority::Low,
                );
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }
}
