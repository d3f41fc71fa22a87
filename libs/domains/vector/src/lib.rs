//! Vector Domain Library
//!
//! A provider-neutral vector search capability with Qdrant and Pinecone
//! adapters behind one [`Searcher`] trait.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ ProviderConfig  │  ← discriminator + one block per provider
//! └────────┬────────┘
//!          │ build()
//! ┌────────▼────────┐
//! │ SearchProvider  │  ← closed enum, implements Searcher
//! └────────┬────────┘
//!          │
//!    ┌─────┴──────────────┐
//! ┌──▼─────────────┐ ┌────▼────────────┐
//! │ QdrantSearcher │ │ PineconeSearcher│
//! │ (numeric ids)  │ │ (string ids)    │
//! └────────────────┘ └─────────────────┘
//! ```
//!
//! Qdrant only accepts numeric or UUID point ids, so textual record ids are
//! mapped through [`numeric_id`] and kept in the payload. Pinecone takes the
//! textual id as is.
//!
//! # Usage
//!
//! ```rust,no_run
//! use core_config::FromEnv;
//! use domain_vector::{CancellationToken, ProviderConfig, Searcher, UpsertVector};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let searcher = ProviderConfig::from_env()?.build()?;
//! let cancel = CancellationToken::new();
//!
//! searcher.create_index("demo", &cancel).await?;
//!
//! let record = UpsertVector::new("abc", vec![0.1, 0.2, 0.3, 0.4]).with_metadata("k", "v");
//! searcher.upsert_vector("demo", record, &cancel).await?;
//!
//! let results = searcher
//!     .query_vector("demo", &[0.1, 0.2, 0.3, 0.4], None, &cancel)
//!     .await?;
//! assert_eq!(results[0].id, "abc");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod identifier;
pub mod models;
pub mod pinecone;
pub mod provider;
pub mod qdrant;
pub mod searcher;

// Re-export commonly used types
pub use error::{ErrorKind, VectorError, VectorResult};
pub use identifier::numeric_id;
pub use models::{
    DistanceMetric, Metadata, MetadataValue, QueryFilter, QueryResult, SearchSettings,
    UpsertVector, DEFAULT_DIMENSION, DEFAULT_TOP_K, RESERVED_ID_KEY,
};
pub use pinecone::{PineconeConfig, PineconeSearcher};
pub use provider::{ProviderConfig, ProviderKind, SearchProvider};
pub use qdrant::{QdrantConfig, QdrantSearcher};
pub use searcher::Searcher;
pub use tokio_util::sync::CancellationToken;
