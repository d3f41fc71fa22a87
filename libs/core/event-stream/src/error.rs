//! Stream error types and error categorization
//!
//! Errors are categorized so a supervising caller can decide whether to
//! reconnect:
//! - **Transient**: network trouble, reconnecting may succeed
//! - **Permanent**: bad configuration, rejected credentials or a frame the
//!   client cannot decode; reconnecting as-is will fail the same way

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Category of error for determining reconnect behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transient,
    Permanent,
}

/// Change stream errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Stream configuration error
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Credentials could not be built or were refused
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Connection failure or dropped socket
    #[error("Transport error: {0}")]
    Transport(String),

    /// Frame is not a change message
    #[error("Decode error: {0}")]
    Decode(String),
}

impl StreamError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::InvalidConfig(_) => ErrorCategory::Permanent,
            StreamError::Auth(_) => ErrorCategory::Permanent,
            StreamError::Transport(_) => ErrorCategory::Transient,
            StreamError::Decode(_) => ErrorCategory::Permanent,
        }
    }

    /// Check if reconnecting may help
    pub fn should_reconnect(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Decode(err.to_string())
    }
}

impl From<tungstenite::Error> for StreamError {
    fn from(err: tungstenite::Error) -> Self {
        match &err {
            tungstenite::Error::Http(response)
                if matches!(response.status().as_u16(), 401 | 403) =>
            {
                StreamError::Auth(format!("handshake refused: {}", response.status()))
            }
            tungstenite::Error::Url(_) => StreamError::InvalidConfig(err.to_string()),
            _ => StreamError::Transport(err.to_string()),
        }
    }
}
