use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    self, CollectionStatus, CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId,
    PointStruct, PointsIdsList, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, Span};

use super::QdrantConfig;
use super::payload;
use crate::error::{VectorError, VectorResult};
use crate::identifier::numeric_id;
use crate::models::{
    validate_index_name, validate_record_id, validate_vector, QueryFilter, QueryResult,
    SearchSettings, UpsertVector,
};
use crate::searcher::{cancellable, Searcher, OP_CREATE_INDEX, OP_DELETE, OP_QUERY, OP_UPSERT};

const READY_POLL_ATTEMPTS: u32 = 50;
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Qdrant-backed searcher
///
/// Indexes are collections with a single unnamed cosine vector. Textual ids
/// are mapped to numeric point ids by [`numeric_id`]; the textual id is kept
/// in the payload so query results can report it. Hash collisions overwrite.
pub struct QdrantSearcher {
    client: Qdrant,
    settings: SearchSettings,
    name: String,
}

impl QdrantSearcher {
    pub fn new(config: &QdrantConfig) -> VectorResult<Self> {
        config.validate()?;

        let client = Qdrant::from_url(&config.url())
            .api_key(config.api_key.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorError::Transport(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            settings: config.settings(),
            name: config.name.clone(),
        })
    }

    /// Wrap an already configured client
    pub fn from_client(
        client: Qdrant,
        name: impl Into<String>,
        settings: SearchSettings,
    ) -> VectorResult<Self> {
        settings.validate()?;
        Ok(Self {
            client,
            settings,
            name: name.into(),
        })
    }

    pub fn settings(&self) -> SearchSettings {
        self.settings
    }

    async fn create_collection(&self, index: &str, cancel: &CancellationToken) -> VectorResult<()> {
        validate_index_name(index)?;

        let exists = cancellable(cancel, async {
            Ok(self.client.collection_exists(index).await?)
        })
        .await?;
        if exists {
            return Err(VectorError::AlreadyExists(format!("collection {}", index)));
        }

        let builder = CreateCollectionBuilder::new(index).vectors_config(VectorParamsBuilder::new(
            self.settings.dimension,
            Distance::Cosine,
        ));

        cancellable(cancel, async {
            self.client.create_collection(builder).await?;
            Ok(())
        })
        .await?;

        self.wait_until_ready(index, cancel).await
    }

    async fn wait_until_ready(&self, index: &str, cancel: &CancellationToken) -> VectorResult<()> {
        for attempt in 0..READY_POLL_ATTEMPTS {
            let info = cancellable(cancel, async {
                Ok(self.client.collection_info(index).await?)
            })
            .await?;

            let status = info
                .result
                .map(|result| result.status())
                .unwrap_or(CollectionStatus::UnknownCollectionStatus);

            if status == CollectionStatus::Green {
                debug!(attempt, "Collection ready");
                return Ok(());
            }

            cancellable(cancel, async {
                tokio::time::sleep(READY_POLL_INTERVAL).await;
                Ok(())
            })
            .await?;
        }

        Err(VectorError::Transport(format!(
            "collection {} was not ready after {} status checks",
            index, READY_POLL_ATTEMPTS
        )))
    }

    async fn upsert_point(
        &self,
        index: &str,
        vector: UpsertVector,
        cancel: &CancellationToken,
    ) -> VectorResult<()> {
        validate_index_name(index)?;
        vector.validate()?;

        let point_id = numeric_id(&vector.id)?;
        let UpsertVector {
            id,
            vectors,
            metadata,
        } = vector;

        let point = PointStruct::new(point_id, vectors, payload::to_payload(&id, metadata));
        let builder = UpsertPointsBuilder::new(index, vec![point]).wait(true);

        cancellable(cancel, async {
            self.client.upsert_points(builder).await?;
            Ok(())
        })
        .await
    }

    async fn search(
        &self,
        index: &str,
        vector: &[f32],
        filter: Option<&QueryFilter>,
        cancel: &CancellationToken,
    ) -> VectorResult<Vec<QueryResult>> {
        validate_index_name(index)?;
        validate_vector(vector)?;

        let mut builder = SearchPointsBuilder::new(index, vector.to_vec(), self.settings.top_k)
            .with_payload(true)
            .with_vectors(true);

        if let Some(filter) = filter.map(payload::to_filter).transpose()?.flatten() {
            builder = builder.filter(filter);
        }

        let response = cancellable(cancel, async {
            Ok(self.client.search_points(builder).await?)
        })
        .await?;

        response.result.into_iter().map(Self::to_query_result).collect()
    }

    async fn delete_point(
        &self,
        index: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> VectorResult<()> {
        validate_index_name(index)?;
        validate_record_id(id)?;

        let builder = DeletePointsBuilder::new(index)
            .points(PointsIdsList {
                ids: vec![PointId::from(numeric_id(id)?)],
            })
            .wait(true);

        cancellable(cancel, async {
            self.client.delete_points(builder).await?;
            Ok(())
        })
        .await
    }

    fn to_query_result(point: ScoredPoint) -> VectorResult<QueryResult> {
        let vectors = Self::extract_vector_from_output(&point.vectors);
        let (id, metadata) = payload::from_payload(point.payload);

        // Points written by other tools have no textual id in their payload
        let id = match id {
            Some(id) => id,
            None => point
                .id
                .as_ref()
                .and_then(Self::point_id_to_string)
                .ok_or_else(|| VectorError::Rejected("Missing point ID".to_string()))?,
        };

        Ok(QueryResult {
            id,
            score: point.score,
            vectors,
            metadata,
        })
    }

    fn point_id_to_string(point_id: &PointId) -> Option<String> {
        match &point_id.point_id_options {
            Some(qdrant::point_id::PointIdOptions::Num(num)) => Some(num.to_string()),
            Some(qdrant::point_id::PointIdOptions::Uuid(uuid)) => Some(uuid.clone()),
            None => None,
        }
    }

    /// Extract vector values from VectorsOutput
    /// Note: Uses deprecated data field until the dense accessor is stable
    #[allow(deprecated)]
    fn extract_vector_from_output(vectors: &Option<qdrant::VectorsOutput>) -> Option<Vec<f32>> {
        match vectors {
            Some(qdrant::VectorsOutput {
                vectors_options: Some(opts),
            }) => match opts {
                qdrant::vectors_output::VectorsOptions::Vector(v) => Some(v.data.clone()),
                qdrant::vectors_output::VectorsOptions::Vectors(map) => {
                    map.vectors.values().next().map(|v| v.data.clone())
                }
            },
            _ => None,
        }
    }
}

#[async_trait]
impl Searcher for QdrantSearcher {
    #[instrument(
        skip_all,
        fields(provider = "qdrant", deployment = %self.name, index = %index),
        err(Display)
    )]
    async fn create_index(&self, index: &str, cancel: &CancellationToken) -> VectorResult<()> {
        self.create_collection(index, cancel)
            .await
            .map_err(|e| e.during(OP_CREATE_INDEX))?;

        info!(dimension = self.settings.dimension, "Created collection");
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(provider = "qdrant", deployment = %self.name, index = %index, id = %vector.id),
        err(Display)
    )]
    async fn upsert_vector(
        &self,
        index: &str,
        vector: UpsertVector,
        cancel: &CancellationToken,
    ) -> VectorResult<()> {
        self.upsert_point(index, vector, cancel)
            .await
            .map_err(|e| e.during(OP_UPSERT))?;

        debug!("Upserted point");
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(
            provider = "qdrant",
            deployment = %self.name,
            index = %index,
            filtered = filter.is_some(),
            results = tracing::field::Empty
        ),
        err(Display)
    )]
    async fn query_vector(
        &self,
        index: &str,
        vector: &[f32],
        filter: Option<&QueryFilter>,
        cancel: &CancellationToken,
    ) -> VectorResult<Vec<QueryResult>> {
        let results = self
            .search(index, vector, filter, cancel)
            .await
            .map_err(|e| e.during(OP_QUERY))?;

        Span::current().record("results", results.len());
        info!(results = results.len(), "Queried vectors");
        Ok(results)
    }

    #[instrument(
        skip_all,
        fields(provider = "qdrant", deployment = %self.name, index = %index, id = %id),
        err(Display)
    )]
    async fn delete_vector(
        &self,
        index: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> VectorResult<()> {
        self.delete_point(index, id, cancel)
            .await
            .map_err(|e| e.during(OP_DELETE))?;

        debug!("Deleted point");
        Ok(())
    }
}
