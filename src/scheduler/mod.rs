//! Priority lanes and the policy that picks the next unit of work.
//!
//! Work is stored in three independent FIFO lanes. On every dispatch
//! opportunity the [`selection`] policy decides which lane a worker takes
//! from, bounding High-over-Normal preemption and holding Low back until
//! the other lanes are empty.

pub mod priority;
pub(crate) mod selection;

pub use priority::Priority;

pub(crate) use priority::PriorityQueues;
pub(crate) use selection::Scheduler;
