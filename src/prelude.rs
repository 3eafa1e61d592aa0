pub use crate::config::{Capacity, Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{FixedPool, PanicStrategy, PoolState, UnitOfWork};
pub use crate::scheduler::Priority;
pub use crate::telemetry::MetricsSnapshot;
