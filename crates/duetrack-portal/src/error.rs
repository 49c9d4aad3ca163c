//! Error types for portal operations.

use std::fmt;

use thiserror::Error;

/// High-level classification of a [`PortalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortalErrorCode {
    /// Credentials were missing or rejected.
    AuthenticationFailed,
    /// Connection failed, timed out, or the body could not be read.
    NetworkError,
    /// The portal answered with a 5xx status.
    ServerError,
    /// Unexpected status or page layout.
    InvalidResponse,
    /// An operation was called in the wrong session state.
    InvalidState,
}

impl PortalErrorCode {
    /// Returns true if the operation may succeed when tried again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError | Self::ServerError)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::NetworkError => "network_error",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::InvalidState => "invalid_state",
        }
    }
}

impl fmt::Display for PortalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error while talking to the portal.
#[derive(Debug, Error)]
pub enum PortalError {
    /// User id or password is empty; nothing was sent.
    #[error("user id and password must not be empty")]
    EmptyCredentials,

    /// The portal rejected the credentials.
    #[error("login rejected: {0}")]
    LoginFailed(String),

    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// 401 or 403 on a page that needs a session.
    #[error("authentication required for {url} (status {status})")]
    Authentication { url: String, status: u16 },

    #[error("server error {status} for {url}")]
    Server { url: String, status: u16 },

    #[error("unexpected response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// The page does not have the expected structure.
    #[error("unexpected page layout: {0}")]
    Markup(String),

    #[error("invalid session state: expected {expected}, was {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}

impl PortalError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    pub fn markup(message: impl Into<String>) -> Self {
        Self::Markup(message.into())
    }

    pub fn invalid_response(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns the error code.
    pub fn code(&self) -> PortalErrorCode {
        match self {
            Self::EmptyCredentials | Self::LoginFailed(_) | Self::Authentication { .. } => {
                PortalErrorCode::AuthenticationFailed
            }
            Self::Network { .. } => PortalErrorCode::NetworkError,
            Self::Server { .. } => PortalErrorCode::ServerError,
            Self::InvalidResponse { .. } | Self::Markup(_) => PortalErrorCode::InvalidResponse,
            Self::InvalidState { .. } => PortalErrorCode::InvalidState,
        }
    }

    /// Returns true if this error is transient.
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else {
            err.to_string()
        };
        Self::Network {
            message,
            source: Some(err),
        }
    }
}

/// A specialized Result type for portal operations.
pub type PortalResult<T> = Result<T, PortalError>;
