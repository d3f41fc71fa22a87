//! Fake Pinecone server
//!
//! An in-process axum server that speaks enough of the Pinecone control and
//! data plane for adapter tests: serverless index creation and description,
//! upsert, fetch by id, cosine top-k query with `$eq`/`$in` metadata
//! filters, and delete. Index hosts point back at this server under
//! `/data/{index}`.
//!
//! [`FakePinecone::start_with_write_delay`] makes writes eventually
//! consistent: an upsert or delete is acknowledged at once but only becomes
//! visible to reads after the delay.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Default)]
struct FakeIndex {
    dimension: usize,
    metric: String,
    records: HashMap<String, FakeRecord>,
    pending: Vec<PendingWrite>,
}

enum WriteOp {
    Upsert(String, FakeRecord),
    Delete(String),
}

struct PendingWrite {
    visible_at: Instant,
    op: WriteOp,
}

impl FakeIndex {
    fn write(&mut self, op: WriteOp, delay: Duration) {
        if delay.is_zero() {
            self.apply(op);
        } else {
            self.pending.push(PendingWrite {
                visible_at: Instant::now() + delay,
                op,
            });
        }
    }

    fn apply(&mut self, op: WriteOp) {
        match op {
            WriteOp::Upsert(id, record) => {
                self.records.insert(id, record);
            }
            WriteOp::Delete(id) => {
                self.records.remove(&id);
            }
        }
    }

    /// Apply every pending write whose delay has passed, oldest first
    fn settle(&mut self) {
        let now = Instant::now();
        let ready = self
            .pending
            .iter()
            .take_while(|w| w.visible_at <= now)
            .count();
        let visible: Vec<PendingWrite> = self.pending.drain(..ready).collect();
        for write in visible {
            self.apply(write.op);
        }
    }
}

#[derive(Clone)]
struct FakeRecord {
    values: Vec<f32>,
    metadata: Map<String, Value>,
}

struct FakeState {
    api_key: String,
    base_url: String,
    write_delay: Duration,
    indexes: Mutex<HashMap<String, FakeIndex>>,
}

type Shared = Arc<FakeState>;

/// In-process Pinecone stand-in
///
/// The server is shut down when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::FakePinecone;
///
/// # async fn example() {
/// let pinecone = FakePinecone::start("k").await;
/// // Point the adapter's controller URL at pinecone.url()
/// assert!(pinecone.url().starts_with("http://127.0.0.1:"));
/// # }
/// ```
pub struct FakePinecone {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl FakePinecone {
    /// Start a server that accepts requests carrying `api_key`
    pub async fn start(api_key: &str) -> Self {
        Self::start_with_write_delay(api_key, Duration::ZERO).await
    }

    /// Start a server whose writes become visible only after `delay`
    pub async fn start_with_write_delay(api_key: &str, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Pinecone listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let state = Arc::new(FakeState {
            api_key: api_key.to_string(),
            base_url: format!("http://{}", addr),
            write_delay: delay,
            indexes: Mutex::new(HashMap::new()),
        });

        let router = Router::new()
            .route("/indexes", post(create_index))
            .route("/indexes/{name}", get(describe_index))
            .route("/data/{name}/vectors/upsert", post(upsert))
            .route("/data/{name}/vectors/fetch", get(fetch))
            .route("/data/{name}/query", post(query))
            .route("/data/{name}/vectors/delete", post(delete))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "Fake Pinecone server stopped");
            }
        });

        tracing::info!(%addr, "Fake Pinecone ready");

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Control plane URL
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of records currently visible in `index`
    pub fn record_count(&self, index: &str) -> usize {
        self.state
            .indexes
            .lock()
            .expect("fake Pinecone state poisoned")
            .get_mut(index)
            .map(|i| {
                i.settle();
                i.records.len()
            })
            .unwrap_or(0)
    }

    /// Whether a record with `id` is currently visible in `index`
    pub fn contains(&self, index: &str, id: &str) -> bool {
        self.state
            .indexes
            .lock()
            .expect("fake Pinecone state poisoned")
            .get_mut(index)
            .is_some_and(|i| {
                i.settle();
                i.records.contains_key(id)
            })
    }
}

impl Drop for FakePinecone {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message.into() } })),
    )
        .into_response()
}

fn authorized(state: &FakeState, headers: &HeaderMap) -> Result<(), Response> {
    match headers.get("Api-Key").and_then(|v| v.to_str().ok()) {
        Some(key) if key == state.api_key => Ok(()),
        _ => Err(error(StatusCode::UNAUTHORIZED, "Invalid API Key")),
    }
}

fn describe(state: &FakeState, name: &str, index: &FakeIndex) -> Value {
    json!({
        "name": name,
        "dimension": index.dimension,
        "metric": index.metric,
        "host": format!("{}/data/{}", state.base_url, name),
        "status": { "ready": true, "state": "Ready" }
    })
}

async fn create_index(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorized(&state, &headers) {
        return rejection;
    }

    let name = body["name"].as_str().unwrap_or_default().to_string();
    let dimension = body["dimension"].as_u64().unwrap_or(0) as usize;
    if name.is_empty() || dimension == 0 {
        return error(StatusCode::BAD_REQUEST, "name and dimension are required");
    }

    let mut indexes = state.indexes.lock().expect("fake Pinecone state poisoned");
    if indexes.contains_key(&name) {
        return error(StatusCode::CONFLICT, format!("Resource {} already exists", name));
    }

    let index = FakeIndex {
        dimension,
        metric: body["metric"].as_str().unwrap_or("cosine").to_string(),
        records: HashMap::new(),
        pending: Vec::new(),
    };
    let description = describe(&state, &name, &index);
    indexes.insert(name, index);

    (StatusCode::CREATED, Json(description)).into_response()
}

async fn describe_index(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    if let Err(rejection) = authorized(&state, &headers) {
        return rejection;
    }

    let indexes = state.indexes.lock().expect("fake Pinecone state poisoned");
    match indexes.get(&name) {
        Some(index) => Json(describe(&state, &name, index)).into_response(),
        None => error(StatusCode::NOT_FOUND, format!("Resource {} not found", name)),
    }
}

async fn upsert(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorized(&state, &headers) {
        return rejection;
    }

    let mut indexes = state.indexes.lock().expect("fake Pinecone state poisoned");
    let Some(index) = indexes.get_mut(&name) else {
        return error(StatusCode::NOT_FOUND, format!("Resource {} not found", name));
    };

    let vectors = body["vectors"].as_array().cloned().unwrap_or_default();
    let mut records = Vec::with_capacity(vectors.len());
    for vector in &vectors {
        let id = vector["id"].as_str().unwrap_or_default().to_string();
        let values = parse_values(&vector["values"]);
        if id.is_empty() {
            return error(StatusCode::BAD_REQUEST, "Vector ID must not be empty");
        }
        if values.len() != index.dimension {
            return error(
                StatusCode::BAD_REQUEST,
                format!(
                    "Vector dimension {} does not match the dimension of the index {}",
                    values.len(),
                    index.dimension
                ),
            );
        }
        let metadata = vector["metadata"].as_object().cloned().unwrap_or_default();
        records.push((id, FakeRecord { values, metadata }));
    }

    let upserted = records.len();
    for (id, record) in records {
        index.write(WriteOp::Upsert(id, record), state.write_delay);
    }

    Json(json!({ "upsertedCount": upserted })).into_response()
}

async fn query(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorized(&state, &headers) {
        return rejection;
    }

    let mut indexes = state.indexes.lock().expect("fake Pinecone state poisoned");
    let Some(index) = indexes.get_mut(&name) else {
        return error(StatusCode::NOT_FOUND, format!("Resource {} not found", name));
    };
    index.settle();

    let vector = parse_values(&body["vector"]);
    if vector.len() != index.dimension {
        return error(
            StatusCode::BAD_REQUEST,
            format!(
                "Query vector dimension {} does not match the dimension of the index {}",
                vector.len(),
                index.dimension
            ),
        );
    }

    let top_k = body["topK"].as_u64().unwrap_or(10) as usize;
    let include_values = body["includeValues"].as_bool().unwrap_or(false);
    let include_metadata = body["includeMetadata"].as_bool().unwrap_or(false);
    let filter = body.get("filter").and_then(Value::as_object);

    let mut scored: Vec<(&String, &FakeRecord, f32)> = index
        .records
        .iter()
        .filter(|(_, record)| filter.is_none_or(|f| matches_filter(&record.metadata, f)))
        .map(|(id, record)| (id, record, cosine(&vector, &record.values)))
        .collect();

    // Ties broken by id so results are stable
    scored.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(b.0)));
    scored.truncate(top_k);

    let matches: Vec<Value> = scored
        .into_iter()
        .map(|(id, record, score)| {
            let mut entry = json!({ "id": id, "score": score });
            if include_values {
                entry["values"] = json!(record.values);
            }
            if include_metadata && !record.metadata.is_empty() {
                entry["metadata"] = Value::Object(record.metadata.clone());
            }
            entry
        })
        .collect();

    Json(json!({ "matches": matches, "namespace": "" })).into_response()
}

async fn delete(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorized(&state, &headers) {
        return rejection;
    }

    let mut indexes = state.indexes.lock().expect("fake Pinecone state poisoned");
    let Some(index) = indexes.get_mut(&name) else {
        return error(StatusCode::NOT_FOUND, format!("Resource {} not found", name));
    };

    for id in body["ids"].as_array().into_iter().flatten() {
        if let Some(id) = id.as_str() {
            index.write(WriteOp::Delete(id.to_string()), state.write_delay);
        }
    }

    Json(json!({})).into_response()
}

async fn fetch(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    if let Err(rejection) = authorized(&state, &headers) {
        return rejection;
    }

    let mut indexes = state.indexes.lock().expect("fake Pinecone state poisoned");
    let Some(index) = indexes.get_mut(&name) else {
        return error(StatusCode::NOT_FOUND, format!("Resource {} not found", name));
    };
    index.settle();

    let mut vectors = Map::new();
    for (key, id) in params {
        if key != "ids" {
            continue;
        }
        if let Some(record) = index.records.get(&id) {
            let mut entry = json!({ "id": id, "values": record.values });
            if !record.metadata.is_empty() {
                entry["metadata"] = Value::Object(record.metadata.clone());
            }
            vectors.insert(id, entry);
        }
    }

    Json(json!({ "vectors": vectors, "namespace": "" })).into_response()
}

fn parse_values(value: &Value) -> Vec<f32> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_f64)
                .map(|v| v as f32)
                .collect()
        })
        .unwrap_or_default()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn matches_filter(metadata: &Map<String, Value>, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(key, clause)| {
        let field = metadata.get(key);
        match clause {
            Value::Object(ops) => ops.iter().all(|(op, operand)| match op.as_str() {
                "$eq" => field.is_some_and(|f| field_contains(f, operand)),
                "$in" => operand
                    .as_array()
                    .is_some_and(|options| {
                        field.is_some_and(|f| options.iter().any(|o| field_contains(f, o)))
                    }),
                _ => false,
            }),
            // Bare values are shorthand for $eq
            operand => field.is_some_and(|f| field_contains(f, operand)),
        }
    })
}

/// Equality against a scalar field, membership against a list field
fn field_contains(field: &Value, operand: &Value) -> bool {
    match field {
        Value::Array(items) => items.iter().any(|item| scalar_eq(item, operand)),
        scalar => scalar_eq(scalar, operand),
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}
