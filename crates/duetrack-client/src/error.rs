//! Client error types.

use duetrack_core::{StoreError, TracingError};
use duetrack_portal::PortalError;
use thiserror::Error;

use crate::secret::SecretError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    /// A `pass::` or `env::` reference of the given setting did not resolve.
    #[error("failed to resolve {field}: {source}")]
    Secret {
        field: &'static str,
        #[source]
        source: SecretError,
    },

    /// Reading or writing a deadline file failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("portal error: {0}")]
    Portal(#[from] PortalError),

    /// The scrape ran but produced nothing usable.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Bad command-line input (unknown course, invalid status...).
    #[error("invalid input: {0}")]
    Input(String),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to initialize logging: {0}")]
    Tracing(#[from] TracingError),
}

impl ClientError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Secret { .. } | Self::Input(_) => 2,
            Self::Portal(e) if e.is_retryable() => 75,
            _ => 1,
        }
    }
}
