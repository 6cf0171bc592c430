//! Fake HTTP services for integration tests.
//!
//! Each fake is an axum router served on its own tokio runtime in a
//! background thread, so tests can drive the blocking clients directly.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rag_sync::index::{DocumentIndex, MemoryIndex};
use rag_sync::models::{
    CreateIndexRequest, DeleteDocumentsRequest, Document, ListDocumentsResponse,
    UpdateDocumentsRequest,
};

/// Serve `router` on an ephemeral localhost port and return the port.
pub fn spawn(router: Router) -> u16 {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap().port()).unwrap();
            axum::serve(listener, router).await.unwrap();
        });
    });
    rx.recv().unwrap()
}

// ============ Fake RAG service ============

/// A request the fake RAG service received: method, path, and JSON body.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Value,
}

#[derive(Clone)]
pub struct FakeRag {
    pub index: Arc<MemoryIndex>,
    pub requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeRag {
    pub fn start() -> (Self, u16) {
        let fake = FakeRag {
            index: Arc::new(MemoryIndex::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let router = Router::new()
            .route("/indexes", get(list_indexes))
            .route("/index", axum::routing::post(create_index))
            .route(
                "/indexes/{branch}/documents",
                get(query_documents)
                    .post(update_documents)
                    .delete(delete_documents),
            )
            .with_state(fake.clone());
        let port = spawn(router);
        (fake, port)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    fn record(&self, method: &'static str, path: String, query: HashMap<String, String>, body: Value) {
        self.requests.lock().unwrap().push(Recorded {
            method,
            path,
            query,
            body,
        });
    }
}

async fn list_indexes(State(fake): State<FakeRag>) -> Result<Json<Vec<String>>, StatusCode> {
    fake.record("GET", "/indexes".to_string(), HashMap::new(), Value::Null);
    fake.index
        .list_indexes()
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn create_index(
    State(fake): State<FakeRag>,
    Json(body): Json<Value>,
) -> Result<Json<Vec<Document>>, StatusCode> {
    fake.record("POST", "/index".to_string(), HashMap::new(), body.clone());
    let request: CreateIndexRequest =
        serde_json::from_value(body).map_err(|_| StatusCode::BAD_REQUEST)?;
    fake.index
        .create_index(&request.index_name, request.documents)
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn query_documents(
    State(fake): State<FakeRag>,
    Path(branch): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ListDocumentsResponse>, StatusCode> {
    fake.record(
        "GET",
        format!("/indexes/{}/documents", branch),
        query.clone(),
        Value::Null,
    );
    let filter: HashMap<String, String> = query
        .get("metadata_filter")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .ok_or(StatusCode::BAD_REQUEST)?;
    let file_name = filter
        .get("file_name")
        .cloned()
        .ok_or(StatusCode::BAD_REQUEST)?;
    let documents = fake
        .index
        .query_documents_by_file_name(&branch, &[file_name])
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(ListDocumentsResponse {
        count: documents.len(),
        documents,
    }))
}

async fn update_documents(
    State(fake): State<FakeRag>,
    Path(branch): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    fake.record(
        "POST",
        format!("/indexes/{}/documents", branch),
        HashMap::new(),
        body.clone(),
    );
    let request: UpdateDocumentsRequest =
        serde_json::from_value(body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let outcome = fake
        .index
        .update_documents(&branch, request.documents)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(serde_json::to_value(outcome).unwrap()))
}

async fn delete_documents(
    State(fake): State<FakeRag>,
    Path(branch): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    fake.record(
        "DELETE",
        format!("/indexes/{}/documents", branch),
        HashMap::new(),
        body.clone(),
    );
    let request: DeleteDocumentsRequest =
        serde_json::from_value(body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let documents: Vec<Document> = request
        .doc_ids
        .into_iter()
        .map(|id| Document {
            document_id: id,
            ..Default::default()
        })
        .collect();
    let outcome = fake
        .index
        .delete_documents(&branch, &documents)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(serde_json::to_value(outcome).unwrap()))
}

// ============ Fake GitHub API ============

/// One `files[]` entry as the GitHub API lists it.
pub fn modified(name: &str) -> Value {
    json!({ "filename": name, "status": "modified" })
}

pub fn renamed(from: &str, to: &str) -> Value {
    json!({ "filename": to, "status": "renamed", "previous_filename": from })
}

#[derive(Clone)]
pub struct FakeGithub {
    pub token: String,
    pub commit_files: Arc<Vec<Value>>,
    pub pull_files: Arc<Vec<Value>>,
}

impl FakeGithub {
    pub fn start(token: &str, commit_files: Vec<String>, pull_files: Vec<String>) -> u16 {
        Self::start_entries(
            token,
            commit_files.iter().map(|name| modified(name)).collect(),
            pull_files.iter().map(|name| modified(name)).collect(),
        )
    }

    pub fn start_entries(token: &str, commit_files: Vec<Value>, pull_files: Vec<Value>) -> u16 {
        let fake = FakeGithub {
            token: token.to_string(),
            commit_files: Arc::new(commit_files),
            pull_files: Arc::new(pull_files),
        };
        let router = Router::new()
            .route("/repos/{owner}/{repo}/commits/{sha}", get(commit))
            .route("/repos/{owner}/{repo}/pulls/{number}/files", get(self::pull_files))
            .with_state(fake);
        spawn(router)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", self.token))
            .unwrap_or(false)
    }
}

fn page_of(files: &[Value], query: &HashMap<String, String>) -> Vec<Value> {
    let per_page: usize = query
        .get("per_page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let page: usize = query.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    files
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .cloned()
        .collect()
}

async fn commit(
    State(fake): State<FakeGithub>,
    Path((owner, repo, sha)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if !fake.authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if owner != "acme" || repo != "app" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({
        "sha": sha,
        "files": page_of(&fake.commit_files, &query),
    })))
}

async fn pull_files(
    State(fake): State<FakeGithub>,
    Path((owner, repo, _number)): Path<(String, String, u64)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if !fake.authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if owner != "acme" || repo != "app" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(Value::Array(page_of(&fake.pull_files, &query))))
}
