//! Pinecone REST request and response bodies

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{VectorError, VectorResult};
use crate::models::{Metadata, MetadataValue, QueryFilter};

#[derive(Debug, Serialize)]
pub(super) struct CreateIndexRequest<'a> {
    pub name: &'a str,
    pub dimension: u64,
    pub metric: &'a str,
    pub spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct IndexSpec<'a> {
    pub serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct ServerlessSpec<'a> {
    pub cloud: &'a str,
    pub region: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct IndexDescription {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Serialize)]
pub(super) struct UpsertRequest<'a> {
    pub vectors: Vec<WireVector<'a>>,
}

#[derive(Debug, Serialize)]
pub(super) struct WireVector<'a> {
    pub id: &'a str,
    pub values: &'a [f32],
    #[serde(skip_serializing_if = "no_metadata")]
    pub metadata: &'a Metadata,
}

fn no_metadata(metadata: &&Metadata) -> bool {
    metadata.is_empty()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct QueryRequest<'a> {
    pub vector: &'a [f32],
    pub top_k: u64,
    pub include_values: bool,
    pub include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct QueryResponse {
    #[serde(default)]
    pub matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Match {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Serialize)]
pub(super) struct DeleteRequest<'a> {
    pub ids: [&'a str; 1],
}

/// `GET /vectors/fetch` body; ids that are not (yet) visible are absent
#[derive(Debug, Default, Deserialize)]
pub(super) struct FetchResponse {
    #[serde(default)]
    pub vectors: HashMap<String, FetchedVector>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FetchedVector {
    #[serde(default)]
    pub values: Vec<f32>,
}

/// Translate a vendor-neutral filter into Pinecone's metadata filter language.
pub(super) fn to_filter(filter: &QueryFilter) -> VectorResult<Option<Value>> {
    if filter.is_empty() {
        return Ok(None);
    }

    let mut clauses = Map::with_capacity(filter.len());
    for (key, value) in filter {
        let clause = match value {
            MetadataValue::TextList(items) => json!({ "$in": items }),
            MetadataValue::Float(f) if !f.is_finite() => {
                return Err(VectorError::InvalidInput(format!(
                    "filter value for '{}' is not finite",
                    key
                )));
            }
            scalar => json!({ "$eq": scalar }),
        };
        clauses.insert(key.clone(), clause);
    }

    Ok(Some(Value::Object(clauses)))
}
