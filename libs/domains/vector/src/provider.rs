//! Provider selection
//!
//! A [`ProviderConfig`] names exactly one provider and carries a block per
//! provider. Only the selected block is read. Building the config yields a
//! [`SearchProvider`]; the choice is fixed for the life of the value.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use core_config::{env_optional, env_parse, env_parse_optional, env_required, ConfigError, FromEnv};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{VectorError, VectorResult};
use crate::models::{QueryFilter, QueryResult, SearchSettings, UpsertVector};
use crate::pinecone::{PineconeConfig, PineconeSearcher};
use crate::qdrant::{QdrantConfig, QdrantSearcher};
use crate::searcher::Searcher;

/// Known providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Qdrant,
    Pinecone,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Qdrant => "qdrant",
            ProviderKind::Pinecone => "pinecone",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qdrant" => Ok(ProviderKind::Qdrant),
            "pinecone" => Ok(ProviderKind::Pinecone),
            other => Err(VectorError::InvalidConfig(format!(
                "unknown provider '{}', expected one of: qdrant, pinecone",
                other
            ))),
        }
    }
}

/// Searcher configuration with a provider discriminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qdrant: Option<QdrantConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinecone: Option<PineconeConfig>,
}

impl ProviderConfig {
    pub fn qdrant(config: QdrantConfig) -> Self {
        Self {
            provider: ProviderKind::Qdrant.as_str().to_string(),
            qdrant: Some(config),
            pinecone: None,
        }
    }

    pub fn pinecone(config: PineconeConfig) -> Self {
        Self {
            provider: ProviderKind::Pinecone.as_str().to_string(),
            qdrant: None,
            pinecone: Some(config),
        }
    }

    /// Load from a JSON document
    pub fn from_json_file(path: impl AsRef<Path>) -> VectorResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VectorError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Check the discriminator and the selected block
    pub fn validate(&self) -> VectorResult<ProviderKind> {
        let kind: ProviderKind = self.provider.parse()?;

        match kind {
            ProviderKind::Qdrant => self
                .qdrant
                .as_ref()
                .ok_or_else(|| VectorError::InvalidConfig("qdrant block is required".to_string()))?
                .validate()?,
            ProviderKind::Pinecone => self
                .pinecone
                .as_ref()
                .ok_or_else(|| {
                    VectorError::InvalidConfig("pinecone block is required".to_string())
                })?
                .validate()?,
        }

        Ok(kind)
    }

    /// Validate and construct the selected searcher
    pub fn build(&self) -> VectorResult<SearchProvider> {
        let kind = self.validate()?;

        let provider = match (kind, &self.qdrant, &self.pinecone) {
            (ProviderKind::Qdrant, Some(config), _) => {
                SearchProvider::Qdrant(QdrantSearcher::new(config)?)
            }
            (ProviderKind::Pinecone, _, Some(config)) => {
                SearchProvider::Pinecone(PineconeSearcher::new(config)?)
            }
            // validate() guarantees the selected block is present
            (kind, _, _) => {
                return Err(VectorError::InvalidConfig(format!("{} block is required", kind)));
            }
        };

        info!(provider = %kind, "Vector search provider configured");
        Ok(provider)
    }
}

impl FromEnv for ProviderConfig {
    /// Reads `VECTOR_PROVIDER` and the selected provider's variables:
    /// - qdrant: `QDRANT_NAME`, `QDRANT_HOST`, `QDRANT_PORT`, `QDRANT_API_KEY`
    /// - pinecone: `PINECONE_NAME`, `PINECONE_API_KEY`, optional `PINECONE_CONTROLLER_URL`
    ///
    /// `VECTOR_DIMENSION` and `VECTOR_TOP_K` override the defaults for either.
    fn from_env() -> Result<Self, ConfigError> {
        let provider = env_required("VECTOR_PROVIDER")?;
        let dimension: Option<u64> = env_parse_optional("VECTOR_DIMENSION")?;
        let top_k: Option<u64> = env_parse_optional("VECTOR_TOP_K")?;

        let mut config = Self {
            provider,
            qdrant: None,
            pinecone: None,
        };

        match config.provider.parse::<ProviderKind>() {
            Ok(ProviderKind::Qdrant) => {
                let mut qdrant = QdrantConfig::new(
                    env_required("QDRANT_NAME")?,
                    env_required("QDRANT_HOST")?,
                    env_parse("QDRANT_PORT")?,
                    env_required("QDRANT_API_KEY")?,
                );
                if let Some(dimension) = dimension {
                    qdrant = qdrant.with_dimension(dimension);
                }
                if let Some(top_k) = top_k {
                    qdrant = qdrant.with_top_k(top_k);
                }
                config.qdrant = Some(qdrant);
            }
            Ok(ProviderKind::Pinecone) => {
                let mut pinecone =
                    PineconeConfig::new(env_required("PINECONE_NAME")?, env_required("PINECONE_API_KEY")?);
                if let Some(url) = env_optional("PINECONE_CONTROLLER_URL") {
                    pinecone = pinecone.with_controller_url(url);
                }
                if let Some(dimension) = dimension {
                    pinecone = pinecone.with_dimension(dimension);
                }
                if let Some(top_k) = top_k {
                    pinecone = pinecone.with_top_k(top_k);
                }
                config.pinecone = Some(pinecone);
            }
            // Left for validate() to report
            Err(_) => {}
        }

        Ok(config)
    }
}

/// The configured searcher
pub enum SearchProvider {
    Qdrant(QdrantSearcher),
    Pinecone(PineconeSearcher),
}

impl SearchProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            SearchProvider::Qdrant(_) => ProviderKind::Qdrant,
            SearchProvider::Pinecone(_) => ProviderKind::Pinecone,
        }
    }

    pub fn settings(&self) -> SearchSettings {
        match self {
            SearchProvider::Qdrant(searcher) => searcher.settings(),
            SearchProvider::Pinecone(searcher) => searcher.settings(),
        }
    }
}

#[async_trait]
impl Searcher for SearchProvider {
    async fn create_index(&self, index: &str, cancel: &CancellationToken) -> VectorResult<()> {
        match self {
            SearchProvider::Qdrant(searcher) => searcher.create_index(index, cancel).await,
            SearchProvider::Pinecone(searcher) => searcher.create_index(index, cancel).await,
        }
    }

    async fn upsert_vector(
        &self,
        index: &str,
        vector: UpsertVector,
        cancel: &CancellationToken,
    ) -> VectorResult<()> {
        match self {
            SearchProvider::Qdrant(searcher) => searcher.upsert_vector(index, vector, cancel).await,
            SearchProvider::Pinecone(searcher) => {
                searcher.upsert_vector(index, vector, cancel).await
            }
        }
    }

    async fn query_vector(
        &self,
        index: &str,
        vector: &[f32],
        filter: Option<&QueryFilter>,
        cancel: &CancellationToken,
    ) -> VectorResult<Vec<QueryResult>> {
        match self {
            SearchProvider::Qdrant(searcher) => {
                searcher.query_vector(index, vector, filter, cancel).await
            }
            SearchProvider::Pinecone(searcher) => {
                searcher.query_vector(index, vector, filter, cancel).await
            }
        }
    }

    async fn delete_vector(
        &self,
        index: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> VectorResult<()> {
        match self {
            SearchProvider::Qdrant(searcher) => searcher.delete_vector(index, id, cancel).await,
            SearchProvider::Pinecone(searcher) => searcher.delete_vector(index, id, cancel).await,
        }
    }
}
