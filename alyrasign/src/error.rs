//! Client error taxonomy.

use thiserror::Error;

/// Error returned by every backend operation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// An operation needing a signer ran without one.
    #[error("wallet not connected")]
    NotConnected,

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Submission or program failure. `logs` holds program log lines when the
    /// node returned them.
    #[error("operation failed: {message}")]
    OperationFailed { message: String, logs: Vec<String> },

    /// Malformed JSON in the local store. Handled inside the store, which
    /// substitutes an empty collection.
    #[error("malformed '{key}' entry in local store: {reason}")]
    ParseFailure { key: String, reason: String },

    #[error("{field} exceeds {max} bytes ({actual})")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("local store error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl ClientError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ClientError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Wraps an error without program logs as `OperationFailed`.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        ClientError::OperationFailed {
            message: error.to_string(),
            logs: Vec::new(),
        }
    }
}

/// Rejects `value` when it is longer than `max` bytes.
pub fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ClientError> {
    if value.len() > max {
        return Err(ClientError::FieldTooLong {
            field,
            max,
            actual: value.len(),
        });
    }
    Ok(())
}
