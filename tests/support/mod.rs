//! In-process mock of the Job Tracker backend.
//!
//! Serves the `/api/v1` routes from memory on an ephemeral port, records
//! every request it receives, and can be scripted to fail a route with a
//! given status and body.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use job_tracker::models::{FetchProjectsInput, GenerateEmailInput, NewUser};
use job_tracker::storage::{MemoryStorage, Storage, TOKEN_KEY};
use job_tracker::JobTracker;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Notify;
use uuid::Uuid;

const API_PREFIX: &str = "/api/v1";

/// A request as seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path below `/api/v1`.
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
struct MockUser {
    id: String,
    username: String,
    email: String,
    password: String,
}

impl MockUser {
    fn token(&self) -> String {
        format!("token-{}", self.id)
    }

    fn profile(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "email": self.email,
            "created_at": "2024-01-01T00:00:00",
        })
    }
}

#[derive(Default)]
struct Inner {
    users: Vec<MockUser>,
    applications: Vec<Value>,
    projects: Vec<Value>,
    failures: HashMap<(Method, String), (StatusCode, Value)>,
    gates: HashMap<(Method, String), Arc<Notify>>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve on an ephemeral port and return the base URL (`.../api/v1`).
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Failed to read mock address");
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock backend failed");
        });
        format!("http://{}{}", addr, API_PREFIX)
    }

    fn router(&self) -> Router {
        let api = Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/me", get(me))
            .route("/applications/", get(list_applications).post(create_application))
            .route(
                "/applications/{id}",
                get(get_application)
                    .put(update_application)
                    .delete(delete_application),
            )
            .route("/applications/{id}/generate_email", post(generate_email))
            .route("/applications/{id}/suggest_projects", get(suggest_projects))
            .route("/github/fetch", post(fetch_projects))
            .route("/github/", get(list_projects))
            .route("/github/rate-limit", get(rate_limit));

        Router::new()
            .nest(API_PREFIX, api)
            .layer(middleware::from_fn_with_state(self.clone(), record))
            .with_state(self.clone())
    }

    /// Create an account and return a token valid for it.
    pub fn seed_user(&self, username: &str, email: &str, password: &str) -> String {
        let user = MockUser {
            id: Uuid::new_v4().simple().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let token = user.token();
        self.inner.lock().users.push(user);
        token
    }

    /// Store an application directly, bypassing the API. Returns its id.
    pub fn seed_application(&self, status: &str, title: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.inner.lock().applications.push(json!({
            "id": id,
            "user_id": "seeded",
            "linkedin_url": format!("https://www.linkedin.com/jobs/view/{}", id),
            "title": title,
            "company": "Acme",
            "status": status,
            "status_history": [],
            "documents": [],
            "contacts": [],
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        }));
        id
    }

    /// Store an imported project directly. Returns its id.
    pub fn seed_project(&self, name: &str) -> String {
        let project = project_json(name, "seeded");
        let id = project["id"].as_str().unwrap_or_default().to_string();
        self.inner.lock().projects.push(project);
        id
    }

    /// Answer `method path` with `status` and `{"detail": detail}` from now on.
    pub fn fail(&self, method: Method, path: &str, status: u16, detail: &str) {
        self.fail_with_body(method, path, status, json!({ "detail": detail }));
    }

    pub fn fail_with_body(&self, method: Method, path: &str, status: u16, body: Value) {
        let status = StatusCode::from_u16(status).expect("valid status code");
        self.inner
            .lock()
            .failures
            .insert((method, path.to_string()), (status, body));
    }

    /// Hold every `method path` request after recording it until the
    /// returned handle is notified, one request per `notify_one`.
    pub fn gate(&self, method: Method, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner
            .lock()
            .gates
            .insert((method, path.to_string()), Arc::clone(&gate));
        gate
    }

    /// Wait until `method path` has been received at least once.
    pub async fn wait_for_request(&self, method: Method, path: &str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.requests_to(method.clone(), path).is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Request never reached the mock backend");
    }

    pub fn clear_failures(&self) {
        self.inner.lock().failures.clear();
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().requests.clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.inner.lock().requests.clear();
    }
}

/// A mock backend and a tracker using fresh in-memory storage.
pub async fn setup() -> (MockBackend, JobTracker) {
    setup_with(MemoryStorage::new()).await
}

pub async fn setup_with(storage: MemoryStorage) -> (MockBackend, JobTracker) {
    let mock = MockBackend::new();
    let base_url = mock.spawn().await;
    let tracker = JobTracker::with_storage(base_url, Arc::new(storage));
    (mock, tracker)
}

/// A mock backend with one user whose token is already stored.
pub async fn logged_in() -> (MockBackend, JobTracker) {
    let mock = MockBackend::new();
    let token = mock.seed_user("ada", "ada@example.com", "secret");
    let base_url = mock.spawn().await;
    let storage = MemoryStorage::new();
    storage.set(TOKEN_KEY, &token);
    let tracker = JobTracker::with_storage(base_url, Arc::new(storage));
    (mock, tracker)
}

// ============================================================
// Request recording and scripted failures
// ============================================================

fn recorded_request(req: &Request) -> RecordedRequest {
    let header_str = |name: header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    RecordedRequest {
        method: req.method().clone(),
        path: req
            .uri()
            .path()
            .strip_prefix(API_PREFIX)
            .unwrap_or(req.uri().path())
            .to_string(),
        query: req.uri().query().map(str::to_string),
        authorization: header_str(header::AUTHORIZATION),
        content_type: header_str(header::CONTENT_TYPE),
    }
}

async fn record(State(mock): State<MockBackend>, req: Request, next: Next) -> Response {
    let recorded = recorded_request(&req);
    let path = recorded.path.clone();

    let (scripted, gate) = {
        let mut inner = mock.inner.lock();
        let key = (recorded.method.clone(), path);
        inner.requests.push(recorded);
        (inner.failures.get(&key).cloned(), inner.gates.get(&key).cloned())
    };

    if let Some(gate) = gate {
        gate.notified().await;
    }

    match scripted {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => next.run(req).await,
    }
}

// ============================================================
// Handlers
// ============================================================

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn current_user(mock: &MockBackend, headers: &HeaderMap) -> Result<MockUser, Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    mock.inner
        .lock()
        .users
        .iter()
        .find(|u| Some(u.token().as_str()) == token)
        .cloned()
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
}

fn project_json(name: &str, user_id: &str) -> Value {
    json!({
        "id": Uuid::new_v4().simple().to_string(),
        "user_id": user_id,
        "github_id": 1000 + name.len() as i64,
        "name": name,
        "description": format!("{} repository", name),
        "html_url": format!("https://github.com/example/{}", name),
        "language": "Rust",
        "stars": 3,
        "forks": 1,
        "readme_content": null,
        "last_commit_date": "2024-05-01T12:00:00",
        "created_at": "2024-05-02T08:00:00",
        "updated_at": "2024-05-02T08:00:00",
    })
}

async fn register(State(mock): State<MockBackend>, Json(input): Json<NewUser>) -> Response {
    let mut inner = mock.inner.lock();
    if inner.users.iter().any(|u| u.email == input.email) {
        return detail(StatusCode::BAD_REQUEST, "Email already registered");
    }
    if inner.users.iter().any(|u| u.username == input.username) {
        return detail(StatusCode::BAD_REQUEST, "Username already taken");
    }
    let user = MockUser {
        id: Uuid::new_v4().simple().to_string(),
        username: input.username,
        email: input.email,
        password: input.password,
    };
    let profile = user.profile();
    inner.users.push(user);
    Json(profile).into_response()
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
    grant_type: Option<String>,
}

async fn login(State(mock): State<MockBackend>, Form(form): Form<LoginForm>) -> Response {
    if form.grant_type.as_deref() != Some("password") {
        return detail(StatusCode::BAD_REQUEST, "unsupported_grant_type");
    }
    let inner = mock.inner.lock();
    match inner
        .users
        .iter()
        .find(|u| u.email == form.username && u.password == form.password)
    {
        Some(user) => Json(json!({ "access_token": user.token(), "token_type": "bearer" }))
            .into_response(),
        None => detail(StatusCode::UNAUTHORIZED, "Incorrect email or password"),
    }
}

async fn me(State(mock): State<MockBackend>, headers: HeaderMap) -> Response {
    match current_user(&mock, &headers) {
        Ok(user) => Json(user.profile()).into_response(),
        Err(response) => response,
    }
}

async fn list_applications(State(mock): State<MockBackend>, headers: HeaderMap) -> Response {
    if let Err(response) = current_user(&mock, &headers) {
        return response;
    }
    Json(mock.inner.lock().applications.clone()).into_response()
}

async fn get_application(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = current_user(&mock, &headers) {
        return response;
    }
    let inner = mock.inner.lock();
    match inner.applications.iter().find(|a| a["id"] == id.as_str()) {
        Some(app) => Json(app.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Application not found"),
    }
}

async fn create_application(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> Response {
    let user = match current_user(&mock, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let now = Utc::now().to_rfc3339();
    let mut app = input;
    if app.get("status").is_none() {
        app["status"] = json!("Wishlist");
    }
    app["id"] = json!(Uuid::new_v4().simple().to_string());
    app["user_id"] = json!(user.id);
    let status = app["status"].clone();
    app["status_history"] = json!([{ "status": status, "changed_at": now }]);
    app["documents"] = json!([]);
    app["contacts"] = json!([]);
    app["created_at"] = json!(now);
    app["updated_at"] = json!(now);

    mock.inner.lock().applications.push(app.clone());
    Json(app).into_response()
}

async fn update_application(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<Value>,
) -> Response {
    if let Err(response) = current_user(&mock, &headers) {
        return response;
    }
    let mut inner = mock.inner.lock();
    let Some(app) = inner
        .applications
        .iter_mut()
        .find(|a| a["id"] == id.as_str())
    else {
        return detail(StatusCode::NOT_FOUND, "Application not found");
    };
    if let Some(fields) = input.as_object() {
        for (key, value) in fields {
            if !value.is_null() {
                app[key.as_str()] = value.clone();
            }
        }
    }
    app["updated_at"] = json!(Utc::now().to_rfc3339());
    Json(app.clone()).into_response()
}

async fn delete_application(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = current_user(&mock, &headers) {
        return response;
    }
    let mut inner = mock.inner.lock();
    let before = inner.applications.len();
    inner.applications.retain(|a| a["id"] != id.as_str());
    if inner.applications.len() == before {
        return detail(StatusCode::NOT_FOUND, "Application not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn generate_email(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<GenerateEmailInput>,
) -> Response {
    if let Err(response) = current_user(&mock, &headers) {
        return response;
    }
    let inner = mock.inner.lock();
    let Some(app) = inner.applications.iter().find(|a| a["id"] == id.as_str()) else {
        return detail(StatusCode::NOT_FOUND, "Application not found");
    };
    let text = format!(
        "[{}] Dear {}, I am applying for {} and would like to share {} projects.",
        input.language,
        app["company"].as_str().unwrap_or("team"),
        app["title"].as_str().unwrap_or("the role"),
        input.project_ids.len()
    );
    Json(json!({ "email_text": text })).into_response()
}

async fn suggest_projects(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = current_user(&mock, &headers) {
        return response;
    }
    let inner = mock.inner.lock();
    if !inner.applications.iter().any(|a| a["id"] == id.as_str()) {
        return detail(StatusCode::NOT_FOUND, "Application not found");
    }
    let ids: Vec<Value> = inner
        .projects
        .iter()
        .take(2)
        .map(|p| p["id"].clone())
        .collect();
    Json(json!({ "suggested_project_ids": ids })).into_response()
}

async fn fetch_projects(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Json(input): Json<FetchProjectsInput>,
) -> Response {
    let user = match current_user(&mock, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let projects = vec![
        project_json(&format!("{}-cli", input.username), &user.id),
        project_json(&format!("{}-site", input.username), &user.id),
    ];
    mock.inner.lock().projects = projects.clone();
    Json(projects).into_response()
}

async fn list_projects(State(mock): State<MockBackend>, headers: HeaderMap) -> Response {
    if let Err(response) = current_user(&mock, &headers) {
        return response;
    }
    Json(mock.inner.lock().projects.clone()).into_response()
}

async fn rate_limit(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = current_user(&mock, &headers) {
        return response;
    }
    let limit = if params.contains_key("token") { 5000 } else { 60 };
    Json(json!({
        "limit": limit,
        "remaining": limit - 1,
        "reset": "2024-05-02T09:00:00",
        "used": 1,
    }))
    .into_response()
}
