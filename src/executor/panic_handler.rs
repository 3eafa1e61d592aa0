use super::task::{Task, TaskId};
use crate::scheduler::Priority;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a worker does when a unit of work fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicStrategy {
    /// Abort the process on a panicking unit. Returned errors are still logged.
    Abort,
    /// Count the failure without logging it.
    Isolate,
    /// Log the failure at `warn` and keep going.
    LogAndContinue,
}

impl Default for PanicStrategy {
    fn default() -> Self {
        PanicStrategy::LogAndContinue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Panicked,
    Returned,
}

/// Description of a contained execution failure.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub task: TaskId,
    pub priority: Priority,
    pub kind: FailureKind,
    pub message: String,
}

/// Runs units of work and keeps their failures inside the worker.
#[derive(Debug)]
pub struct PanicHandler {
    strategy: PanicStrategy,
    failure_count: AtomicUsize,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            failure_count: AtomicUsize::new(0),
        }
    }

    pub(crate) fn execute(&self, task: Task) -> Result<(), TaskFailure> {
        let (id, priority) = (task.id, task.priority);

        let failure = match catch_unwind(AssertUnwindSafe(|| task.execute())) {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => TaskFailure {
                task: id,
                priority,
                kind: FailureKind::Returned,
                message: err.to_string(),
            },
            Err(payload) => {
                if self.strategy == PanicStrategy::Abort {
                    tracing::error!(task = %id, "unit of work panicked, aborting");
                    std::process::abort();
                }
                TaskFailure {
                    task: id,
                    priority,
                    kind: FailureKind::Panicked,
                    message: panic_message(payload.as_ref()),
                }
            }
        };

        self.failure_count.fetch_add(1, Ordering::Relaxed);

        if self.strategy != PanicStrategy::Isolate {
            tracing::warn!(
                task = %failure.task,
                priority = %failure.priority,
                kind = ?failure.kind,
                "unit of work failed: {}",
                failure.message
            );
        }

        Err(failure)
    }

    pub fn failure_count(&self) -> usize {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn strategy(&self) -> PanicStrategy {
        self.strategy
    }
}

impl Default for PanicHandler {
    fn default() -> Self {
        Self::new(PanicStrategy::default())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
