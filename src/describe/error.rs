//! Snapshot error types.

use thiserror::Error;

/// Errors that can occur while (de)serializing snapshots
#[derive(Debug, Error)]
pub enum DescribeError {
    /// Serialization to JSON failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}
