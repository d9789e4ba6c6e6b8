//! Store error types.
//!
//! This module defines the errors raised by the metadata store and the
//! vector index.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// A connection to the store could not be used.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Connecting failed on every attempt.
    #[error("Store unavailable after {attempts} attempts: {reason}")]
    Unavailable { attempts: usize, reason: String },

    /// A command was rejected by the store.
    #[error("Command error: {0}")]
    CommandError(String),

    /// Failed to encode or decode a stored record.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Failed to create the vector index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// An embedding does not match the index dimension.
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    /// The vector index does not exist.
    #[error("Index not found: {0}")]
    IndexNotFound(String),
}

impl StoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an unavailable error.
    pub fn unavailable(attempts: usize, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            attempts,
            reason: reason.into(),
        }
    }

    /// Create a command error.
    pub fn command(msg: impl Into<String>) -> Self {
        Self::CommandError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// True when the error means the connection itself is unusable.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::ConnectionError(_) | Self::Unavailable { .. })
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            Self::ConnectionError(err.to_string())
        } else {
            Self::CommandError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
