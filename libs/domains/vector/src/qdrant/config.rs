use serde::{Deserialize, Serialize};

use crate::error::{VectorError, VectorResult};
use crate::models::{DEFAULT_DIMENSION, DEFAULT_TOP_K, SearchSettings};

/// Qdrant connection configuration
///
/// Missing required fields deserialize as empty and are caught by `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QdrantConfig {
    /// Deployment label, recorded on every span
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_dimension")]
    pub dimension: u64,
    #[serde(default = "default_top_k")]
    pub top_k: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_dimension() -> u64 {
    DEFAULT_DIMENSION
}

fn default_top_k() -> u64 {
    DEFAULT_TOP_K
}

fn default_timeout_secs() -> u64 {
    30
}

impl QdrantConfig {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            api_key: api_key.into(),
            dimension: DEFAULT_DIMENSION,
            top_k: DEFAULT_TOP_K,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_dimension(mut self, dimension: u64) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_top_k(mut self, top_k: u64) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// gRPC endpoint; TLS is always on for outbound vendor connections
    pub fn url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }

    pub fn settings(&self) -> SearchSettings {
        SearchSettings::new(self.dimension, self.top_k)
    }

    pub fn validate(&self) -> VectorResult<()> {
        if self.name.is_empty() {
            return Err(VectorError::InvalidConfig("qdrant.name is required".to_string()));
        }
        if self.host.is_empty() {
            return Err(VectorError::InvalidConfig("qdrant.host is required".to_string()));
        }
        if self.port == 0 {
            return Err(VectorError::InvalidConfig(
                "qdrant.port must be non-zero".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(VectorError::InvalidConfig(
                "qdrant.apiKey is required".to_string(),
            ));
        }
        self.settings().validate()
    }
}
