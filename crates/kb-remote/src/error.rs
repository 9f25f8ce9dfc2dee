//! Error types for kb-remote

use serde_json::Value;

/// Result type for kb-remote operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the knowledge store
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a non-success status.
    ///
    /// `body` is the parsed JSON response, or the raw text as a JSON string.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        body: Value,
    },

    /// Network-level failure (connect, timeout, broken body).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// A response was missing required fields or could not be decoded.
    #[error("Invalid payload: {message}")]
    InvalidPayload { message: String },

    #[error("Invalid client configuration: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    /// Whether a retry may succeed: 5xx responses and transport failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status >= 500,
            Error::Transport { .. } => true,
            Error::InvalidPayload { .. } | Error::InvalidConfig { .. } => false,
        }
    }

    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            message: e.to_string(),
        }
    }
}
