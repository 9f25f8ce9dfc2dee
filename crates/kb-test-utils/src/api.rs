//! Fake knowledge API server on axum.
//!
//! `FakeKnowledgeApi::spawn()` starts an HTTP server on a random local port
//! that speaks the dataset/document endpoints, checks the bearer token,
//! paginates listings, and can be told to fail the next requests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;

/// Token the fake server accepts.
pub const FAKE_API_KEY: &str = "test-api-key";

/// Dataset stored by the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeDataset {
    pub id: String,
    pub name: String,
    pub indexing_technique: Option<String>,
    pub permission: Option<String>,
}

/// Document stored by the fake server, with the last request body fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeDocument {
    pub id: String,
    pub name: String,
    pub text: String,
    pub doc_metadata: Option<Value>,
    pub indexing_technique: Option<String>,
    pub process_rule: Option<Value>,
    pub indexing_status: String,
    polls_left: Option<u32>,
}

impl FakeDocument {
    fn to_json(&self, position: usize) -> Value {
        json!({
            "id": self.id,
            "position": position + 1,
            "data_source_type": "upload_file",
            "name": self.name,
            "indexing_status": self.indexing_status,
            "error": null,
            "enabled": true,
            "doc_metadata": self.doc_metadata,
        })
    }

    fn start_indexing(&mut self, polls: u32) {
        if polls == 0 {
            self.indexing_status = "completed".to_string();
            self.polls_left = None;
        } else {
            self.indexing_status = "indexing".to_string();
            self.polls_left = Some(polls);
        }
    }

    fn tick(&mut self) {
        match self.polls_left {
            Some(0) => {
                self.indexing_status = "completed".to_string();
                self.polls_left = None;
            }
            Some(n) => self.polls_left = Some(n - 1),
            None => {}
        }
    }
}

/// Request line as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

/// Internal state of the fake API.
#[derive(Debug)]
pub struct FakeState {
    pub datasets: RwLock<Vec<FakeDataset>>,
    pub documents: RwLock<HashMap<String, Vec<FakeDocument>>>,
    pub requests: RwLock<Vec<RecordedRequest>>,
    failures: RwLock<VecDeque<(u16, Option<String>)>>,
    pending_polls: AtomicU32,
}

impl FakeState {
    fn new() -> Self {
        Self {
            datasets: RwLock::new(Vec::new()),
            documents: RwLock::new(HashMap::new()),
            requests: RwLock::new(Vec::new()),
            failures: RwLock::new(VecDeque::new()),
            pending_polls: AtomicU32::new(0),
        }
    }

    /// Add a dataset and return its id.
    pub async fn add_dataset(&self, name: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.datasets.write().await.push(FakeDataset {
            id: id.clone(),
            name: name.to_string(),
            indexing_technique: None,
            permission: None,
        });
        self.documents.write().await.entry(id.clone()).or_default();
        id
    }

    /// Add an indexed document and return its id.
    pub async fn add_document(
        &self,
        dataset_id: &str,
        name: &str,
        text: &str,
        source_hash: Option<&str>,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.documents
            .write()
            .await
            .entry(dataset_id.to_string())
            .or_default()
            .push(FakeDocument {
                id: id.clone(),
                name: name.to_string(),
                text: text.to_string(),
                doc_metadata: source_hash.map(|h| json!({ "source_hash": h })),
                indexing_technique: None,
                process_rule: None,
                indexing_status: "completed".to_string(),
                polls_left: None,
            });
        id
    }

    pub async fn documents_of(&self, dataset_id: &str) -> Vec<FakeDocument> {
        self.documents
            .read()
            .await
            .get(dataset_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn document_named(&self, dataset_id: &str, name: &str) -> Option<FakeDocument> {
        self.documents_of(dataset_id)
            .await
            .into_iter()
            .find(|d| d.name == name)
    }

    /// Fail the next `times` requests with `status` and a JSON error body.
    pub async fn fail_next(&self, status: u16, times: usize) {
        let mut failures = self.failures.write().await;
        for _ in 0..times {
            failures.push_back((status, None));
        }
    }

    /// Fail the next request with `status` and a plain-text body.
    pub async fn fail_next_with_text(&self, status: u16, body: &str) {
        self.failures
            .write()
            .await
            .push_back((status, Some(body.to_string())));
    }

    /// Written documents report `indexing` for this many listings.
    pub fn set_pending_polls(&self, polls: u32) {
        self.pending_polls.store(polls, Ordering::SeqCst);
    }

    pub async fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Recorded requests matching `method` whose path ends with `suffix`.
    pub async fn count(&self, method: &str, suffix: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.method == method && r.path.ends_with(suffix))
            .count()
    }
}

/// Fake knowledge API: start and get base URL + state.
pub struct FakeKnowledgeApi;

impl FakeKnowledgeApi {
    /// Start a fake API server on a random port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> (String, Arc<FakeState>) {
        let state = Arc::new(FakeState::new());

        let app = Router::new()
            .route("/v1/datasets", get(handle_list_datasets).post(handle_create_dataset))
            .route("/v1/datasets/:dataset_id/documents", get(handle_list_documents))
            .route(
                "/v1/datasets/:dataset_id/document/create_by_text",
                post(handle_create_by_text),
            )
            .route(
                "/v1/datasets/:dataset_id/documents/:document_id/update_by_text",
                post(handle_update_by_text),
            )
            .route(
                "/v1/datasets/:dataset_id/documents/:document_id",
                delete(handle_delete),
            )
            .layer(middleware::from_fn_with_state(state.clone(), guard))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("FakeKnowledgeApi: failed to bind: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("FakeKnowledgeApi: no local address: {e}"));

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        (format!("http://{addr}"), state)
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": code, "message": message, "status": status.as_u16() })),
    )
        .into_response()
}

async fn guard(State(state): State<Arc<FakeState>>, request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.write().await.push(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        authorization: authorization.clone(),
    });

    let injected = state.failures.write().await.pop_front();
    if let Some((status, text)) = injected {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return match text {
            Some(body) => (status, body).into_response(),
            None => error_response(status, "injected_failure", "injected failure"),
        };
    }

    if authorization.as_deref() != Some(format!("Bearer {FAKE_API_KEY}").as_str()) {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Access token is invalid",
        );
    }

    next.run(request).await
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

fn paginate(items: Vec<Value>, query: &PageQuery) -> Value {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).max(1);
    let total = items.len();
    let start = (page - 1) * limit;
    let data: Vec<Value> = items.into_iter().skip(start).take(limit).collect();
    json!({
        "data": data,
        "has_more": start + limit < total,
        "limit": limit,
        "page": page,
        "total": total,
    })
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

async fn handle_list_datasets(
    State(state): State<Arc<FakeState>>,
    Query(query): Query<PageQuery>,
) -> Response {
    let items = state
        .datasets
        .read()
        .await
        .iter()
        .map(|d| json!({ "id": d.id, "name": d.name, "description": null }))
        .collect();
    Json(paginate(items, &query)).into_response()
}

async fn handle_create_dataset(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> Response {
    let Some(name) = string_field(&body, "name") else {
        return error_response(StatusCode::BAD_REQUEST, "invalid_param", "name is required");
    };

    let mut datasets = state.datasets.write().await;
    if datasets.iter().any(|d| d.name == name) {
        return error_response(
            StatusCode::CONFLICT,
            "dataset_name_duplicate",
            "The dataset name already exists",
        );
    }
    let dataset = FakeDataset {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        indexing_technique: string_field(&body, "indexing_technique"),
        permission: string_field(&body, "permission"),
    };
    datasets.push(dataset.clone());
    state
        .documents
        .write()
        .await
        .entry(dataset.id.clone())
        .or_default();

    Json(json!({ "id": dataset.id, "name": dataset.name, "description": body.get("description") }))
        .into_response()
}

async fn handle_list_documents(
    State(state): State<Arc<FakeState>>,
    Path(dataset_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let mut documents = state.documents.write().await;
    let Some(docs) = documents.get_mut(&dataset_id) else {
        return error_response(StatusCode::NOT_FOUND, "not_found", "Dataset not found");
    };
    for doc in docs.iter_mut() {
        doc.tick();
    }
    let items = docs
        .iter()
        .enumerate()
        .map(|(i, d)| d.to_json(i))
        .collect();
    Json(paginate(items, &query)).into_response()
}

async fn handle_create_by_text(
    State(state): State<Arc<FakeState>>,
    Path(dataset_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let (Some(name), Some(text)) = (string_field(&body, "name"), string_field(&body, "text"))
    else {
        return error_response(StatusCode::BAD_REQUEST, "invalid_param", "name and text are required");
    };

    let polls = state.pending_polls.load(Ordering::SeqCst);
    let mut documents = state.documents.write().await;
    let Some(docs) = documents.get_mut(&dataset_id) else {
        return error_response(StatusCode::NOT_FOUND, "not_found", "Dataset not found");
    };
    let mut doc = FakeDocument {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        text,
        doc_metadata: body.get("doc_metadata").cloned(),
        indexing_technique: string_field(&body, "indexing_technique"),
        process_rule: body.get("process_rule").cloned(),
        indexing_status: "waiting".to_string(),
        polls_left: None,
    };
    doc.start_indexing(polls);
    let response = json!({ "document": doc.to_json(docs.len()), "batch": uuid::Uuid::new_v4().to_string() });
    docs.push(doc);
    Json(response).into_response()
}

async fn handle_update_by_text(
    State(state): State<Arc<FakeState>>,
    Path((dataset_id, document_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let polls = state.pending_polls.load(Ordering::SeqCst);
    let mut documents = state.documents.write().await;
    let Some(docs) = documents.get_mut(&dataset_id) else {
        return error_response(StatusCode::NOT_FOUND, "not_found", "Dataset not found");
    };
    let Some((position, doc)) = docs
        .iter_mut()
        .enumerate()
        .find(|(_, d)| d.id == document_id)
    else {
        return error_response(StatusCode::NOT_FOUND, "not_found", "Document not found");
    };

    if let Some(name) = string_field(&body, "name") {
        doc.name = name;
    }
    if let Some(text) = string_field(&body, "text") {
        doc.text = text;
    }
    if let Some(metadata) = body.get("doc_metadata") {
        doc.doc_metadata = Some(metadata.clone());
    }
    doc.start_indexing(polls);

    Json(json!({ "document": doc.to_json(position), "batch": uuid::Uuid::new_v4().to_string() }))
        .into_response()
}

async fn handle_delete(
    State(state): State<Arc<FakeState>>,
    Path((dataset_id, document_id)): Path<(String, String)>,
) -> Response {
    let mut documents = state.documents.write().await;
    let Some(docs) = documents.get_mut(&dataset_id) else {
        return error_response(StatusCode::NOT_FOUND, "not_found", "Dataset not found");
    };
    let before = docs.len();
    docs.retain(|d| d.id != document_id);
    if docs.len() == before {
        return error_response(StatusCode::NOT_FOUND, "not_found", "Document not found");
    }
    StatusCode::NO_CONTENT.into_response()
}
