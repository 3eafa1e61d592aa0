pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConfiguration(msg.into())
    }

    pub fn argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn task_failed<S: Into<String>>(msg: S) -> Self {
        Error::TaskFailed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("capacity must be > 0");
        assert_eq!(err.to_string(), "invalid configuration: capacity must be > 0");

        let err = Error::argument("unit of work is missing");
        assert_eq!(err.to_string(), "invalid argument: unit of work is missing");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "no threads left");
        let err: Error = io.into();
        assert!(matches!(err, Error::Spawn(_)));
    }
}
