//! Stream configuration
//!
//! This module provides `StreamConfig` for locating the change feed.

use std::time::Duration;

use crate::error::StreamError;

/// Path of the change feed under the versioned API root
pub const DEFAULT_CHANGES_PATH: &str = "websockets/data_changes";

const API_ROOT: &str = "/api/v1/";

/// Configuration for the change stream client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Backend base endpoint (http, https, ws or wss)
    pub base_url: String,

    /// Feed path below `/api/v1/`
    pub path: String,

    /// Output channel capacity; 1 keeps the reader in lockstep with the consumer
    pub channel_capacity: usize,

    /// Upper bound on the websocket handshake
    pub connect_timeout: Duration,
}

impl StreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: DEFAULT_CHANGES_PATH.to_string(),
            channel_capacity: 1,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        self.websocket_url()?;
        if self.channel_capacity == 0 {
            return Err(StreamError::InvalidConfig(
                "channel capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Derive the websocket URL: http becomes ws, https becomes wss
    pub fn websocket_url(&self) -> Result<String, StreamError> {
        let base = self.base_url.trim().trim_end_matches('/');

        let (scheme, rest) = base.split_once("://").ok_or_else(|| {
            StreamError::InvalidConfig(format!("base URL '{}' has no scheme", self.base_url))
        })?;

        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(StreamError::InvalidConfig(format!(
                    "unsupported scheme '{}'",
                    other
                )));
            }
        };

        if rest.is_empty() {
            return Err(StreamError::InvalidConfig(
                "base URL has no host".to_string(),
            ));
        }

        Ok(format!(
            "{}://{}{}{}",
            scheme,
            rest,
            API_ROOT,
            self.path.trim_start_matches('/')
        ))
    }
}
