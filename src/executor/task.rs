//! Units of work and their queued representation.

use crate::error::{Error, Result};
use crate::scheduler::Priority;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a submitted unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An opaque piece of work with a single entry point.
///
/// Implemented for every `FnOnce() -> R + Send + 'static` closure whose
/// return type is `()` or `Result<(), E>` with a displayable `E`. A unit
/// fails either by returning `Err` or by panicking; both are contained by
/// the worker that runs it.
pub trait UnitOfWork: Send + 'static {
    fn run(self: Box<Self>) -> Result<()>;
}

/// Return types a closure submitted as a unit of work may produce.
pub trait TaskOutput {
    fn into_outcome(self) -> Result<()>;
}

impl TaskOutput for () {
    fn into_outcome(self) -> Result<()> {
        Ok(())
    }
}

impl<E: fmt::Display> TaskOutput for std::result::Result<(), E> {
    fn into_outcome(self) -> Result<()> {
        self.map_err(|e| Error::task_failed(e.to_string()))
    }
}

impl<F, R> UnitOfWork for F
where
    F: FnOnce() -> R + Send + 'static,
    R: TaskOutput,
{
    fn run(self: Box<Self>) -> Result<()> {
        (*self)().into_outcome()
    }
}

/// A unit of work waiting in, or taken from, a priority queue.
pub(crate) struct Task {
    pub(crate) id: TaskId,
    pub(crate) unit: Box<dyn UnitOfWork>,
    pub(crate) priority: Priority,
    pub(crate) enqueue_time: Instant,
}

impl Task {
    pub fn new(unit: Box<dyn UnitOfWork>, priority: Priority) -> Self {
        Task {
            id: TaskId::next(),
            unit,
            priority,
            enqueue_time: Instant::now(),
        }
    }

    /// Run the unit, consuming it. Panics are not caught here.
    pub fn execute(self) -> Result<()> {
        self.unit.run()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("enqueue_time", &self.enqueue_time)
            .finish()
    }
}
