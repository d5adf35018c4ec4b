//! Error types for the Kafka admin core library.

use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Kafka admin library.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Kafka protocol error
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// Coordination service (ZooKeeper) error
    #[error("Coordination error: {0}")]
    Coordination(#[from] CoordinationError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Consumer group not present in the current snapshot
    #[error("Consumer group not found: {0}")]
    GroupNotFound(String),

    /// Offset reset rejected before or by the broker
    #[error("Offset reset failed for group {group} on {topic}:{partition}: {message}")]
    OffsetReset {
        group: String,
        topic: String,
        partition: i32,
        message: String,
    },
}

/// Kafka-specific errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum KafkaError {
    /// Connection failed
    #[error("Failed to connect to broker {broker}: {message}")]
    ConnectionFailed { broker: String, message: String },

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Broker error response
    #[error("Broker returned error code {code}: {message}")]
    BrokerError { code: i16, message: String },

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// No available brokers
    #[error("No available brokers")]
    NoBrokersAvailable,

    /// Group coordinator lookup failed
    #[error("Coordinator not available for group {group}: error code {code}")]
    CoordinatorNotAvailable { group: String, code: i16 },
}

/// Coordination service errors. A missing node is never an error; see
/// [`crate::coordination::CoordinationClient`].
#[derive(Error, Debug)]
pub enum CoordinationError {
    /// Could not establish a session
    #[error("Failed to connect to {connect}: {message}")]
    Connection { connect: String, message: String },

    /// Request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Session or request level failure reported by the service
    #[error("Request on {path} failed: {message}")]
    Request { path: String, message: String },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// True when the error means a collaborator could not be reached at all,
    /// as opposed to a refusal for one particular group or request.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Coordination(_) | Error::Io(_) => true,
            Error::Kafka(e) => matches!(
                e,
                KafkaError::ConnectionFailed { .. }
                    | KafkaError::Timeout(_)
                    | KafkaError::NoBrokersAvailable
            ),
            _ => false,
        }
    }
}
