//! Searcher error types
//!
//! Every failure carries one [`ErrorKind`]. Adapters classify vendor errors
//! into kinds; public operations wrap them with an operation tag via
//! [`VectorError::during`]. [`VectorError::kind`] sees through the tag.

use core_config::ConfigError;
use thiserror::Error;

/// Kind of failure, independent of provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    InvalidConfig,
    NotFound,
    AlreadyExists,
    Rejected,
    Unsupported,
    Transport,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Rejected by provider: {0}")]
    Rejected(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{operation}: {source}")]
    Context {
        operation: &'static str,
        #[source]
        source: Box<VectorError>,
    },
}

pub type VectorResult<T> = Result<T, VectorError>;

impl VectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VectorError::InvalidInput(_) => ErrorKind::InvalidInput,
            VectorError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            VectorError::NotFound(_) => ErrorKind::NotFound,
            VectorError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            VectorError::Rejected(_) => ErrorKind::Rejected,
            VectorError::Unsupported(_) => ErrorKind::Unsupported,
            VectorError::Transport(_) => ErrorKind::Transport,
            VectorError::Cancelled => ErrorKind::Cancelled,
            VectorError::Context { source, .. } => source.kind(),
        }
    }

    /// Tag the error with the operation that produced it.
    ///
    /// Tagging twice keeps the innermost tag.
    pub fn during(self, operation: &'static str) -> Self {
        match self {
            tagged @ VectorError::Context { .. } => tagged,
            other => VectorError::Context {
                operation,
                source: Box::new(other),
            },
        }
    }

    /// The operation tag, if any.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            VectorError::Context { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Whether the caller may retry the same call unchanged.
    ///
    /// Writes are idempotent by id, so this holds for upserts as well.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Cancelled)
    }

    pub(crate) fn from_http_status(status: reqwest::StatusCode, body: String) -> Self {
        use reqwest::StatusCode;

        let detail = if body.is_empty() {
            status.to_string()
        } else {
            format!("{}: {}", status, body)
        };

        match status {
            StatusCode::NOT_FOUND => VectorError::NotFound(detail),
            StatusCode::CONFLICT => VectorError::AlreadyExists(detail),
            StatusCode::BAD_REQUEST
            | StatusCode::UNPROCESSABLE_ENTITY
            | StatusCode::PAYLOAD_TOO_LARGE => VectorError::Rejected(detail),
            _ => VectorError::Transport(detail),
        }
    }
}

impl From<ConfigError> for VectorError {
    fn from(err: ConfigError) -> Self {
        VectorError::InvalidConfig(err.to_string())
    }
}

impl From<reqwest::Error> for VectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            VectorError::Rejected(format!("Unexpected provider response: {}", err))
        } else {
            VectorError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::InvalidConfig(format!("JSON error: {}", err))
    }
}

// gRPC status codes as numbered by the Qdrant transport.
const GRPC_CANCELLED: i32 = 1;
const GRPC_INVALID_ARGUMENT: i32 = 3;
const GRPC_NOT_FOUND: i32 = 5;
const GRPC_ALREADY_EXISTS: i32 = 6;
const GRPC_FAILED_PRECONDITION: i32 = 9;
const GRPC_OUT_OF_RANGE: i32 = 11;

impl From<qdrant_client::QdrantError> for VectorError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        use qdrant_client::QdrantError;

        match err {
            QdrantError::ResponseError { status } => {
                let message = status.message().to_string();
                match status.code() as i32 {
                    GRPC_NOT_FOUND => VectorError::NotFound(message),
                    GRPC_ALREADY_EXISTS => VectorError::AlreadyExists(message),
                    GRPC_INVALID_ARGUMENT | GRPC_FAILED_PRECONDITION | GRPC_OUT_OF_RANGE => {
                        VectorError::Rejected(message)
                    }
                    GRPC_CANCELLED => VectorError::Cancelled,
                    _ => VectorError::Transport(message),
                }
            }
            other => VectorError::Transport(other.to_string()),
        }
    }
}
