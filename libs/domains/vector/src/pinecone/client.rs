use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, Span};

use super::config::{PineconeConfig, API_VERSION};
use super::wire::{
    self, CreateIndexRequest, DeleteRequest, FetchResponse, IndexDescription, IndexSpec,
    QueryRequest, QueryResponse, ServerlessSpec, UpsertRequest, WireVector,
};
use crate::error::{VectorError, VectorResult};
use crate::models::{
    validate_index_name, validate_record_id, validate_vector, QueryFilter, QueryResult,
    SearchSettings, UpsertVector,
};
use crate::searcher::{cancellable, Searcher, OP_CREATE_INDEX, OP_DELETE, OP_QUERY, OP_UPSERT};

const READY_POLL_ATTEMPTS: u32 = 120;
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pinecone-backed searcher
///
/// Record ids are sent verbatim. Each index's data-plane host is resolved
/// through the control plane on first use and cached for the life of the
/// searcher.
pub struct PineconeSearcher {
    client: Client,
    config: PineconeConfig,
    hosts: RwLock<HashMap<String, String>>,
}

impl PineconeSearcher {
    pub fn new(config: &PineconeConfig) -> VectorResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
            hosts: RwLock::new(HashMap::new()),
        })
    }

    pub fn settings(&self) -> SearchSettings {
        self.config.settings()
    }

    fn controller(&self, path: &str) -> String {
        format!("{}{}", self.config.controller_url.trim_end_matches('/'), path)
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.authorize(self.client.post(url))
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.authorize(self.client.get(url))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    /// Send a request, classifying non-2xx responses by status
    async fn send(&self, request: RequestBuilder, cancel: &CancellationToken) -> VectorResult<Response> {
        let response = cancellable(cancel, async { Ok(request.send().await?) }).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!(status = %status, error = %body, "Pinecone API error");
        Err(VectorError::from_http_status(status, body))
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        cancel: &CancellationToken,
    ) -> VectorResult<T> {
        cancellable(cancel, async { Ok(response.json::<T>().await?) }).await
    }

    async fn describe_index(
        &self,
        index: &str,
        cancel: &CancellationToken,
    ) -> VectorResult<IndexDescription> {
        let response = self
            .send(self.get(&self.controller(&format!("/indexes/{}", index))), cancel)
            .await?;
        Self::read_json(response, cancel).await
    }

    /// Data-plane base URL for `index`
    async fn index_host(&self, index: &str, cancel: &CancellationToken) -> VectorResult<String> {
        if let Some(host) = self.hosts.read().await.get(index) {
            return Ok(host.clone());
        }

        let description = self.describe_index(index, cancel).await?;
        if description.host.is_empty() || !description.status.ready {
            return Err(VectorError::Transport(format!(
                "index {} is not ready (state: {})",
                index, description.status.state
            )));
        }

        let host = data_plane_url(&description.host);
        self.hosts
            .write()
            .await
            .insert(index.to_string(), host.clone());
        Ok(host)
    }

    async fn provision_index(&self, index: &str, cancel: &CancellationToken) -> VectorResult<()> {
        validate_index_name(index)?;

        let request = CreateIndexRequest {
            name: index,
            dimension: self.config.dimension,
            metric: self.settings().metric.as_str(),
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.config.cloud,
                    region: &self.config.region,
                },
            },
        };

        self.send(self.post(&self.controller("/indexes")).json(&request), cancel)
            .await?;

        self.wait_until_ready(index, cancel).await
    }

    async fn wait_until_ready(&self, index: &str, cancel: &CancellationToken) -> VectorResult<()> {
        for attempt in 0..READY_POLL_ATTEMPTS {
            let description = self.describe_index(index, cancel).await?;

            if description.status.ready && !description.host.is_empty() {
                debug!(attempt, host = %description.host, "Index ready");
                self.hosts
                    .write()
                    .await
                    .insert(index.to_string(), data_plane_url(&description.host));
                return Ok(());
            }

            debug!(attempt, state = %description.status.state, "Waiting for index");
            cancellable(cancel, async {
                tokio::time::sleep(READY_POLL_INTERVAL).await;
                Ok(())
            })
            .await?;
        }

        Err(VectorError::Transport(format!(
            "index {} was not ready after {} status checks",
            index, READY_POLL_ATTEMPTS
        )))
    }

    async fn upsert_record(
        &self,
        index: &str,
        vector: &UpsertVector,
        cancel: &CancellationToken,
    ) -> VectorResult<()> {
        validate_index_name(index)?;
        vector.validate()?;

        let host = self.index_host(index, cancel).await?;
        let request = UpsertRequest {
            vectors: vec![WireVector {
                id: &vector.id,
                values: &vector.vectors,
                metadata: &vector.metadata,
            }],
        };

        self.send(self.post(&format!("{}/vectors/upsert", host)).json(&request), cancel)
            .await?;

        self.wait_until_visible(&host, &vector.id, Some(vector.vectors.as_slice()), cancel)
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

        let request = QueryRequest {
            vector,
            top_k: self.config.top_k,
            include_values: true,
            include_metadata: true,
            filter: filter.map(wire::to_filter).transpose()?.flatten(),
        };

        let host = self.index_host(index, cancel).await?;
        let response = self
            .send(self.post(&format!("{}/query", host)).json(&request), cancel)
            .await?;
        let body: QueryResponse = Self::read_json(response, cancel).await?;

        Ok(body
            .matches
            .into_iter()
            .map(|m| QueryResult {
                id: m.id,
                score: m.score,
                vectors: (!m.values.is_empty()).then_some(m.values),
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    async fn delete_record(
        &self,
        index: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> VectorResult<()> {
        validate_index_name(index)?;
        validate_record_id(id)?;

        let host = self.index_host(index, cancel).await?;
        let request = DeleteRequest { ids: [id] };

        self.send(self.post(&format!("{}/vectors/delete", host)).json(&request), cancel)
            .await?;

        self.wait_until_visible(&host, id, None, cancel).await
    }

    /// Poll `fetch` until a write is observable.
    ///
    /// Writes are eventually consistent. With `expected` set, waits for the
    /// record to come back with those values; with `None`, for it to be gone.
    async fn wait_until_visible(
        &self,
        host: &str,
        id: &str,
        expected: Option<&[f32]>,
        cancel: &CancellationToken,
    ) -> VectorResult<()> {
        let url = format!("{}/vectors/fetch", host);

        for attempt in 0..READY_POLL_ATTEMPTS {
            let response = self
                .send(self.get(&url).query(&[("ids", id)]), cancel)
                .await?;
            let body: FetchResponse = Self::read_json(response, cancel).await?;

            let visible = match (expected, body.vectors.get(id)) {
                (Some(values), Some(stored)) => same_values(values, &stored.values),
                (None, None) => true,
                _ => false,
            };
            if visible {
                debug!(attempt, "Write visible");
                return Ok(());
            }

            debug!(attempt, "Waiting for write to become visible");
            cancellable(cancel, async {
                tokio::time::sleep(READY_POLL_INTERVAL).await;
                Ok(())
            })
            .await?;
        }

        Err(VectorError::Transport(format!(
            "write to {} was not visible after {} fetches",
            id, READY_POLL_ATTEMPTS
        )))
    }
}

fn same_values(expected: &[f32], stored: &[f32]) -> bool {
    expected.len() == stored.len()
        && expected
            .iter()
            .zip(stored)
            .all(|(a, b)| (a - b).abs() <= f32::EPSILON * a.abs().max(1.0))
}

/// Index hosts come back bare; local stand-ins may carry a scheme.
fn data_plane_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait]
impl Searcher for PineconeSearcher {
    #[instrument(
        skip_all,
        fields(provider = "pinecone", deployment = %self.config.name, index = %index),
        err(Display)
    )]
    async fn create_index(&self, index: &str, cancel: &CancellationToken) -> VectorResult<()> {
        self.provision_index(index, cancel)
            .await
            .map_err(|e| e.during(OP_CREATE_INDEX))?;

        info!(dimension = self.config.dimension, "Created index");
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(provider = "pinecone", deployment = %self.config.name, index = %index, id = %vector.id),
        err(Display)
    )]
    async fn upsert_vector(
        &self,
        index: &str,
        vector: UpsertVector,
        cancel: &CancellationToken,
    ) -> VectorResult<()> {
        self.upsert_record(index, &vector, cancel)
            .await
            .map_err(|e| e.during(OP_UPSERT))?;

        debug!("Upserted vector");
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(
            provider = "pinecone",
            deployment = %self.config.name,
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
        fields(provider = "pinecone", deployment = %self.config.name, index = %index, id = %id),
        err(Display)
    )]
    async fn delete_vector(
        &self,
        index: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> VectorResult<()> {
        self.delete_record(index, id, cancel)
            .await
            .map_err(|e| e.during(OP_DELETE))?;

        debug!("Deleted vector");
        Ok(())
    }
}
