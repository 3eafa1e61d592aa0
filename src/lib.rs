//! fixed-pool - a fixed-size thread pool with three-tier priority scheduling
//!
//! A pool owns exactly `capacity` worker threads that drain three FIFO
//! lanes (High, Normal, Low) under a weighted selection policy, and shuts
//! down by draining: once shutdown is requested no new work is admitted,
//! but everything already queued still runs.
//!
//! # Quick Start
//!
//! ```no_run
//! use fixed_pool::prelude::*;
//!
//! let pool = FixedPool::new(4).unwrap();
//!
//! for i in 0..8 {
//!     pool.submit(move || println!("report {}", i), Priority::Low);
//! }
//! pool.submit(|| println!("page the on-call"), Priority::High);
//!
//! // blocks until all nine units have run
//! pool.shutdown();
//! ```
//!
//! # Scheduling
//!
//! - **High** is preferred, but while Normal work is waiting at most
//!   three High units (configurable) are dispatched in a row.
//! - **Normal** runs whenever High is empty or the High streak is spent.
//! - **Low** runs only when both High and Normal are empty.
//!
//! Order within one lane is always submission order.
//!
//! # Failures
//!
//! A unit fails by returning `Err` or by panicking. Either way the failure
//! stays inside the worker: it is logged through `tracing`, counted in the
//! pool's metrics, and the worker moves on. Failed units are not retried.

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod scheduler;
pub mod telemetry;

// Re-export key types at crate root
pub use config::{Capacity, Config, ConfigBuilder};
pub use error::{Error, Result};
pub use executor::{FixedPool, PanicStrategy, PoolState, TaskId, UnitOfWork};
pub use scheduler::Priority;
pub use telemetry::MetricsSnapshot;
