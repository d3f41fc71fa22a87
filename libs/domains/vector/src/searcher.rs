use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{VectorError, VectorResult};
use crate::models::{QueryFilter, QueryResult, UpsertVector};

pub(crate) const OP_CREATE_INDEX: &str = "creating index";
pub(crate) const OP_UPSERT: &str = "upserting vector";
pub(crate) const OP_QUERY: &str = "querying vectors";
pub(crate) const OP_DELETE: &str = "deleting vector";

/// Vendor-neutral vector search capability
///
/// Guarantees shared by every implementation:
/// - a successful `upsert_vector` is visible to the next `query_vector`
///   on the same index (writes wait for commit)
/// - `query_vector` returns matches in descending score order, ties in
///   provider order
/// - filters are applied server-side or the call fails with `Unsupported`
/// - `delete_vector` of an absent id succeeds
///
/// Every operation races its network calls against `cancel`. A cancelled
/// write is indeterminate: it may or may not have been applied.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Create an index with the searcher's dimensionality and cosine metric
    async fn create_index(&self, index: &str, cancel: &CancellationToken) -> VectorResult<()>;

    /// Insert or replace the record with `vector.id`
    async fn upsert_vector(
        &self,
        index: &str,
        vector: UpsertVector,
        cancel: &CancellationToken,
    ) -> VectorResult<()>;

    /// Similarity search, most similar first
    async fn query_vector(
        &self,
        index: &str,
        vector: &[f32],
        filter: Option<&QueryFilter>,
        cancel: &CancellationToken,
    ) -> VectorResult<Vec<QueryResult>>;

    /// Remove the record with `id`; absent ids are not an error
    async fn delete_vector(
        &self,
        index: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> VectorResult<()>;
}

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> VectorResult<T>
where
    F: Future<Output = VectorResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(VectorError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(VectorError::Cancelled),
        result = fut => result,
    }
}
