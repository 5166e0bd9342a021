//! In-process stub of the jobs API for integration tests
//!
//! Serves the same routes as the real service from an in-memory catalog,
//! with switches to simulate the failure modes the client has to tolerate.

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use jobs_catalog_sync::config::ApiKey;
use jobs_catalog_sync::services::gateway::{ApiGateway, BULK_TIMEOUT, PROBE_TIMEOUT};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const STUB_API_KEY: &str = "test-employer-key";

/// How the stub answers `DELETE /jobs`.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkDelete {
    Supported,
    /// Respond with this status and leave the catalog untouched.
    Unavailable(u16),
}

#[derive(Debug)]
pub struct StubState {
    pub api_key: String,
    pub listings: Vec<Value>,
    pub applications: Vec<Value>,
    pub next_listing_id: i64,
    pub next_application_id: i64,
    pub bulk_delete: BulkDelete,
    /// Creates with these titles get a 500.
    pub reject_titles: HashSet<String>,
    /// Deletes of these ids get a 500.
    pub failing_delete_ids: HashSet<i64>,
    /// Listed but already gone: the delete removes them and answers 404.
    pub stale_ids: HashSet<i64>,
    /// When false, `POST /jobs` accepts requests without a key.
    pub require_key_for_create: bool,
    /// `METHOD /path` of every request received, in order.
    pub requests: Vec<String>,
    /// When each entry of `requests` arrived.
    pub received_at: Vec<Instant>,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            api_key: STUB_API_KEY.to_string(),
            listings: Vec::new(),
            applications: Vec::new(),
            next_listing_id: 100,
            next_application_id: 1,
            bulk_delete: BulkDelete::Supported,
            reject_titles: HashSet::new(),
            failing_delete_ids: HashSet::new(),
            stale_ids: HashSet::new(),
            require_key_for_create: true,
            requests: Vec::new(),
            received_at: Vec::new(),
        }
    }
}

impl StubState {
    #[allow(dead_code)]
    pub fn with_listings(mut self, listings: Vec<Value>) -> Self {
        self.listings = listings;
        self
    }

    #[allow(dead_code)]
    pub fn with_applications(mut self, applications: Vec<Value>) -> Self {
        self.applications = applications;
        self
    }

    #[allow(dead_code)]
    pub fn with_bulk_delete(mut self, bulk_delete: BulkDelete) -> Self {
        self.bulk_delete = bulk_delete;
        self
    }

    #[allow(dead_code)]
    pub fn rejecting(mut self, title: &str) -> Self {
        self.reject_titles.insert(title.to_string());
        self
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map_or(false, |key| key == self.api_key)
    }
}

type Shared = Arc<Mutex<StubState>>;

pub struct StubApi {
    pub base_url: String,
    state: Shared,
}

impl StubApi {
    /// Serve `state` on an ephemeral localhost port.
    pub async fn spawn(state: StubState) -> Self {
        let state: Shared = Arc::new(Mutex::new(state));
        let app = Router::new()
            .route("/health", get(health))
            .route(
                "/jobs",
                get(list_jobs).post(create_job).delete(bulk_delete),
            )
            .route("/jobs/{id}", get(get_job).delete(delete_job))
            .route(
                "/applications",
                get(list_applications).post(create_application),
            )
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().expect("stub state poisoned")
    }

    pub fn gateway(&self) -> ApiGateway {
        ApiGateway::new(&self.base_url, ApiKey::new(STUB_API_KEY), BULK_TIMEOUT)
            .expect("gateway")
    }

    #[allow(dead_code)]
    pub fn gateway_with_key(&self, key: &str) -> ApiGateway {
        ApiGateway::new(&self.base_url, ApiKey::new(key), BULK_TIMEOUT).expect("gateway")
    }

    /// Titles currently in the catalog, sorted.
    #[allow(dead_code)]
    pub fn listing_titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self
            .state()
            .listings
            .iter()
            .filter_map(|l| l["title"].as_str().map(str::to_string))
            .collect();
        titles.sort();
        titles
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    #[allow(dead_code)]
    pub fn count_requests(&self, line: &str) -> usize {
        self.state().requests.iter().filter(|r| *r == line).count()
    }

    /// Time between each request and the one before it, labelled with the
    /// later request.
    #[allow(dead_code)]
    pub fn request_gaps(&self) -> Vec<(String, Duration)> {
        let state = self.state();
        let gaps = state
            .received_at
            .windows(2)
            .zip(state.requests.iter().skip(1))
            .map(|(pair, line)| (line.clone(), pair[1].duration_since(pair[0])))
            .collect();
        gaps
    }
}

/// Gateway aimed at a port nothing listens on.
#[allow(dead_code)]
pub async fn unreachable_gateway() -> ApiGateway {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind placeholder listener");
    let addr = listener.local_addr().expect("address");
    drop(listener);
    ApiGateway::new(&format!("http://{}", addr), ApiKey::new(STUB_API_KEY), PROBE_TIMEOUT)
        .expect("gateway")
}

/// Fresh, empty scratch directory under the system temp dir.
#[allow(dead_code)]
pub fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("jobs-sync-test-{}", Uuid::new_v4()))
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let line = format!("{} {}", request.method(), request.uri().path());
    {
        let mut state = state.lock().expect("stub state poisoned");
        state.requests.push(line);
        state.received_at.push(Instant::now());
    }
    next.run(request).await
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "Invalid or missing API key"})),
    )
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"})))
}

async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

async fn list_jobs(State(state): State<Shared>) -> (StatusCode, Json<Value>) {
    let state = state.lock().expect("stub state poisoned");
    (StatusCode::OK, Json(Value::Array(state.listings.clone())))
}

async fn get_job(State(state): State<Shared>, Path(id): Path<i64>) -> (StatusCode, Json<Value>) {
    let state = state.lock().expect("stub state poisoned");
    match state.listings.iter().find(|l| l["id"] == json!(id)) {
        Some(listing) => (StatusCode::OK, Json(listing.clone())),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "Job not found"}))),
    }
}

async fn create_job(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().expect("stub state poisoned");
    if state.require_key_for_create && !state.authorized(&headers) {
        return unauthorized();
    }

    let title = body["title"].as_str().unwrap_or_default().to_string();
    if state.reject_titles.contains(&title) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("could not store '{}'", title)})),
        );
    }

    let id = state.next_listing_id;
    state.next_listing_id += 1;
    body["id"] = json!(id);
    body["posted_at"] = json!("2025-01-10T12:00:00");
    state.listings.push(body.clone());

    (
        StatusCode::CREATED,
        Json(json!({"message": "Job created successfully", "job": body})),
    )
}

async fn bulk_delete(State(state): State<Shared>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().expect("stub state poisoned");
    if !state.authorized(&headers) {
        return unauthorized();
    }

    match state.bulk_delete {
        BulkDelete::Supported => {
            let count = state.listings.len();
            state.listings.clear();
            (
                StatusCode::OK,
                Json(json!({"message": format!("{} jobs deleted", count)})),
            )
        }
        BulkDelete::Unavailable(code) => (
            StatusCode::from_u16(code).expect("valid status"),
            Json(json!({"error": "bulk delete not supported"})),
        ),
    }
}

async fn delete_job(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().expect("stub state poisoned");
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if state.failing_delete_ids.contains(&id) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "database unavailable"})),
        );
    }

    let position = state.listings.iter().position(|l| l["id"] == json!(id));
    if state.stale_ids.remove(&id) {
        if let Some(position) = position {
            state.listings.remove(position);
        }
        return (StatusCode::NOT_FOUND, Json(json!({"error": "Job not found"})));
    }

    match position {
        Some(position) => {
            state.listings.remove(position);
            (
                StatusCode::OK,
                Json(json!({"message": format!("Job {} deleted successfully", id)})),
            )
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "Job not found"}))),
    }
}

async fn list_applications(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let state = state.lock().expect("stub state poisoned");
    if !state.authorized(&headers) {
        return unauthorized();
    }

    let filter = params.get("job_id").and_then(|v| v.parse::<i64>().ok());
    let applications: Vec<Value> = state
        .applications
        .iter()
        .filter(|a| filter.map_or(true, |id| a["job_id"] == json!(id)))
        .cloned()
        .collect();
    (StatusCode::OK, Json(Value::Array(applications)))
}

async fn create_application(
    State(state): State<Shared>,
    Json(mut body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().expect("stub state poisoned");
    let id = state.next_application_id;
    state.next_application_id += 1;
    body["id"] = json!(id);
    body["created_at"] = json!("2025-01-11T08:30:00");
    state.applications.push(body);

    (
        StatusCode::CREATED,
        Json(json!({"message": "Application submitted", "application_id": id})),
    )
}
