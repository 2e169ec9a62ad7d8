//! Error types for the producer/consumer engine.

use std::sync::Arc;

use thiserror::Error as ThisError;

/// The main error type for the producer/consumer engine.
///
/// Only [`Error::Cancelled`] and [`Error::InvalidCapacity`] ever reach the
/// caller of `begin()` or `for_each()`. The remaining variants describe task
/// faults, which the engine contains and logs.
#[derive(Debug, Clone, ThisError)]
pub enum Error {
    /// A producer failed while emitting items
    #[error("Producer error: {0}")]
    Producer(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// A consumer failed while draining items
    #[error("Consumer error: {0}")]
    Consumer(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// A per-item operation failed
    #[error("Operation error: {0}")]
    Operation(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// A task panicked
    #[error("Task panicked: {0}")]
    Panic(String),

    /// The run was cancelled while waiting on the channel or on completion
    #[error("Run was cancelled")]
    Cancelled,

    /// The buffer capacity must hold at least one item
    #[error("Buffer capacity must be at least 1")]
    InvalidCapacity,

    /// A custom error with a message
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Create a producer error from any error type
    pub fn producer<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Producer(Arc::new(error))
    }

    /// Create a consumer error from any error type
    pub fn consumer<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Consumer(Arc::new(error))
    }

    /// Create an operation error from any error type
    pub fn operation<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Operation(Arc::new(error))
    }

    /// Create a custom error with a message
    pub fn custom<S: Into<String>>(message: S) -> Self {
        Error::Custom(message.into())
    }

    /// Build a panic error from the payload carried by a `JoinError` or `catch_unwind`
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Error::Panic(message)
    }

    /// Whether this error is the cancellation signal rather than a fault
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Error::Cancelled
        } else {
            match err.try_into_panic() {
                Ok(payload) => Error::from_panic(payload),
                Err(err) => Error::custom(err.to_string()),
            }
        }
    }
}

impl From<tokio::sync::AcquireError> for Error {
    fn from(_: tokio::sync::AcquireError) -> Self {
        Error::Cancelled
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Error {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Error::Custom(e.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Custom(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Custom(s.to_string())
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Helper trait for converting errors into our Error type
pub trait IntoError<T> {
    fn into_producer_error(self) -> Result<T>;
    fn into_consumer_error(self) -> Result<T>;
    fn into_operation_error(self) -> Result<T>;
}

impl<T, E> IntoError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_producer_error(self) -> Result<T> {
        self.map_err(Error::producer)
    }

    fn into_consumer_error(self) -> Result<T> {
        self.map_err(Error::consumer)
    }

    fn into_operation_error(self) -> Result<T> {
        self.map_err(Error::operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payload_is_rendered() {
        let err = Error::from_panic(Box::new("boom"));
        assert_eq!(err.to_string(), "Task panicked: boom");

        let err = Error::from_panic(Box::new(String::from("bang")));
        assert!(matches!(err, Error::Panic(ref m) if m == "bang"));

        let err = Error::from_panic(Box::new(42u32));
        assert!(matches!(err, Error::Panic(_)));
    }

    #[test]
    fn test_into_error_wraps_foreign_errors() {
        let io: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        let err = io.into_producer_error().unwrap_err();
        assert!(matches!(err, Error::Producer(_)));
        assert_eq!(err.to_string(), "Producer error: disk");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_cancelled_is_distinguished() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::custom("x").is_cancelled());
    }
}
