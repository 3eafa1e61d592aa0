//! Task execution infrastructure.
//!
//! This module provides the fixed worker set, the shared lifecycle state
//! the workers and the pool handle synchronize on, and failure containment
//! for units of work.

pub mod fixed_pool;
pub mod lifecycle;
pub mod panic_handler;
pub mod task;
pub mod worker;

pub use fixed_pool::FixedPool;
pub use lifecycle::PoolState;
pub use panic_handler::{FailureKind, PanicHandler, PanicStrategy, TaskFailure};
pub use task::{TaskId, TaskOutput, UnitOfWork};
pub use worker::{WorkerId, WorkerStats};

pub(crate) use task::Task;
