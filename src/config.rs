use crate::error::{Error, Result};
use crate::executor::PanicStrategy;
use std::fmt;

/// Upper bound on worker threads accepted by [`Config::validate`].
pub const MAX_CAPACITY: usize = 1024;

/// Consecutive High dispatches allowed before a waiting Normal unit runs.
pub const DEFAULT_HIGH_STREAK_LIMIT: usize = 3;

/// A validated, non-zero worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capacity(usize);

impl Capacity {
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::config("capacity must be > 0"));
        }
        if n > MAX_CAPACITY {
            return Err(Error::config(format!(
                "capacity too large (max {})",
                MAX_CAPACITY
            )));
        }
        Ok(Capacity(n))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for Capacity {
    type Error = Error;

    fn try_from(n: usize) -> Result<Self> {
        Capacity::new(n)
    }
}

impl TryFrom<i64> for Capacity {
    type Error = Error;

    fn try_from(n: i64) -> Result<Self> {
        if n <= 0 {
            return Err(Error::config(format!("capacity must be > 0, got {}", n)));
        }
        let n = usize::try_from(n).map_err(|_| Error::config("capacity does not fit in usize"))?;
        Capacity::new(n)
    }
}

impl TryFrom<i32> for Capacity {
    type Error = Error;

    fn try_from(n: i32) -> Result<Self> {
        Capacity::try_from(i64::from(n))
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub capacity: Option<usize>,
    pub high_streak_limit: usize,
    pub pin_workers: bool,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
    pub panic_strategy: PanicStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: None,
            high_streak_limit: DEFAULT_HIGH_STREAK_LIMIT,
            pin_workers: false,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "fixed-pool-worker".to_string(),
            panic_strategy: PanicStrategy::default(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.capacity {
            Capacity::new(n)?;
        }

        if self.high_streak_limit == 0 {
            return Err(Error::config("high_streak_limit must be > 0"));
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        // std::thread::Builder::name rejects interior NULs
        if self.thread_name_prefix.as_bytes().contains(&0) {
            return Err(Error::config("thread_name_prefix must not contain null bytes"));
        }

        Ok(())
    }

    /// Resolved worker count; falls back to the number of logical CPUs.
    pub fn worker_threads(&self) -> usize {
        self.capacity
            .unwrap_or_else(|| num_cpus::get().min(MAX_CAPACITY))
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn capacity(mut self, n: usize) -> Self {
        self.config.capacity = Some(n);
        self
    }

    pub fn high_streak_limit(mut self, limit: usize) -> Self {
        self.config.high_streak_limit = limit;
        self
    }

    pub fn pin_workers(mut self, pin: bool) -> Self {
        self.config.pin_workers = pin;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
