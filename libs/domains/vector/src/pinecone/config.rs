use serde::{Deserialize, Serialize};

use crate::error::{VectorError, VectorResult};
use crate::models::{DEFAULT_DIMENSION, DEFAULT_TOP_K, SearchSettings};

/// Pinecone control plane
pub const DEFAULT_CONTROLLER_URL: &str = "https://api.pinecone.io";

/// Pinecone API version sent with every request
pub const API_VERSION: &str = "2024-07";

/// Pinecone connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PineconeConfig {
    /// Deployment label, recorded on every span
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_dimension")]
    pub dimension: u64,
    #[serde(default = "default_top_k")]
    pub top_k: u64,
    /// Serverless cloud for created indexes
    #[serde(default = "default_cloud")]
    pub cloud: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_controller_url")]
    pub controller_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_dimension() -> u64 {
    DEFAULT_DIMENSION
}

fn default_top_k() -> u64 {
    DEFAULT_TOP_K
}

fn default_cloud() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_controller_url() -> String {
    DEFAULT_CONTROLLER_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl PineconeConfig {
    pub fn new(name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key: api_key.into(),
            dimension: DEFAULT_DIMENSION,
            top_k: DEFAULT_TOP_K,
            cloud: default_cloud(),
            region: default_region(),
            controller_url: default_controller_url(),
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

    pub fn with_controller_url(mut self, url: impl Into<String>) -> Self {
        self.controller_url = url.into();
        self
    }

    pub fn with_serverless(mut self, cloud: impl Into<String>, region: impl Into<String>) -> Self {
        self.cloud = cloud.into();
        self.region = region.into();
        self
    }

    pub fn settings(&self) -> SearchSettings {
        SearchSettings::new(self.dimension, self.top_k)
    }

    pub fn validate(&self) -> VectorResult<()> {
        if self.name.is_empty() {
            return Err(VectorError::InvalidConfig(
                "pinecone.name is required".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(VectorError::InvalidConfig(
                "pinecone.apiKey is required".to_string(),
            ));
        }
        if self.controller_url.is_empty() {
            return Err(VectorError::InvalidConfig(
                "pinecone.controllerUrl must not be empty".to_string(),
            ));
        }
        self.settings().validate()
    }
}
