//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/sync` | Run a sync pass for one blog |
//! | `POST` | `/api/sync/webhook` | WordPress change notification |
//! | `GET`  | `/api/sync/webhook` | Endpoint verification (echoes `challenge` as JSON) |
//! | `GET`  | `/api/sync/logs` | Sync log for a blog, newest first |
//! | `POST` | `/api/sync/logs` | Append a sync log entry |
//! | `GET`  | `/api/blogs` | List blogs (`active`, `domain` filters) |
//! | `POST` | `/api/blogs` | Register a blog |
//! | `GET`  | `/api/blogs/{id}` | One blog |
//! | `PUT`  | `/api/blogs/{id}` | Update a blog's name, niche, description, or WordPress settings |
//! | `DELETE` | `/api/blogs/{id}` | Deactivate a blog (content is kept) |
//! | `GET`  | `/api/blogs/{id}/posts` | Posts of a blog |
//! | `POST` | `/api/blogs/{id}/posts` | Create a local post |
//! | `PATCH`| `/api/posts/{id}` | Edit a local post |
//! | `GET`  | `/api/keywords` | Keywords of a blog with variations |
//! | `POST` | `/api/keywords` | Add a keyword with variations |
//! | `DELETE` | `/api/wordpress/posts/{id}` | Trash (or `force`-delete) a WordPress post |
//! | `GET`  | `/api/wordpress/media/{id}` | One WordPress media item |
//! | `GET`  | `/api/dashboard/stats` | Aggregate counts, one blog or all |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": "invalid webhook payload", "details": [{ "field": "action", "message": "..." }] }
//! ```
//!
//! `details` is a field list for validation errors and the upstream body for
//! remote failures. Status codes follow [`SyncError::status_code`].
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the dashboard frontend
//! can be served from anywhere.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use blogsync_core::models::{
    Blog, BlogFilter, BlogStats, BlogUpdate, ContentPost, MainKeyword, NewBlog, NewKeyword,
    NewPost, NewSyncLog, PostEdit, SyncLogEntry, SyncLogStatus,
};
use blogsync_core::status::PostStatus;
use blogsync_core::store::{check_title, ContentStore};

use crate::config::Config;
use crate::error::{FieldError, SyncError};
use crate::sqlite_store::SqliteStore;
use crate::sync::{SyncCoordinator, SyncDirection, SyncReport, SyncScope};
use crate::webhook::{self, RawWebhookPayload, WebhookAck, SIGNATURE_HEADER};
use crate::wordpress::RemoteMedia;

const DEFAULT_LOG_LIMIT: i64 = 50;
const MAX_LOG_LIMIT: i64 = 200;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SyncCoordinator>,
    /// HMAC secret for inbound webhooks; `None` skips verification.
    pub webhook_secret: Option<String>,
}

impl AppState {
    fn store(&self) -> &Arc<dyn ContentStore> {
        self.coordinator.store()
    }
}

/// Starts the HTTP server.
///
/// Opens the database, applies migrations, and binds to `[server].bind`.
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store: Arc<dyn ContentStore> = Arc::new(SqliteStore::open(config).await?);
    let coordinator = SyncCoordinator::from_config(config, store)?;
    let state = AppState {
        coordinator: Arc::new(coordinator),
        webhook_secret: config.webhook.resolve_secret(),
    };

    if state.webhook_secret.is_none() {
        tracing::warn!("no webhook secret configured; webhook signatures are not verified");
    }

    let app = build_router(state);

    tracing::info!(bind = %config.server.bind, "server listening");

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/sync", post(handle_sync))
        .route(
            "/api/sync/webhook",
            post(handle_webhook).get(handle_webhook_verify),
        )
        .route("/api/sync/logs", get(handle_list_logs).post(handle_append_log))
        .route("/api/blogs", get(handle_list_blogs).post(handle_create_blog))
        .route(
            "/api/blogs/{id}",
            get(handle_get_blog)
                .put(handle_update_blog)
                .delete(handle_deactivate_blog),
        )
        .route(
            "/api/blogs/{id}/posts",
            get(handle_list_posts).post(handle_create_post),
        )
        .route("/api/posts/{id}", patch(handle_edit_post))
        .route(
            "/api/keywords",
            get(handle_list_keywords).post(handle_create_keyword),
        )
        .route("/api/wordpress/posts/{id}", delete(handle_wp_delete_post))
        .route("/api/wordpress/media/{id}", get(handle_wp_get_media))
        .route("/api/dashboard/stats", get(handle_stats))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// Converts a [`SyncError`] into an HTTP response.
pub struct AppError(SyncError);

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        AppError(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError(SyncError::Store(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let details = match &self.0 {
            SyncError::Validation { fields, .. } if !fields.is_empty() => {
                serde_json::to_value(fields).ok()
            }
            SyncError::RemoteUnavailable { body, .. } if !body.is_empty() => {
                Some(Value::String(body.clone()))
            }
            _ => None,
        };
        let error = match &self.0 {
            SyncError::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error, details })).into_response()
    }
}

fn bad_request(field: &str, message: impl Into<String>) -> AppError {
    AppError(SyncError::invalid_field(field, message))
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError(SyncError::not_found(message))
}

/// Decode a JSON body, turning syntax and shape errors into 400s.
fn parse_body<T: DeserializeOwned>(body: Result<Json<Value>, JsonRejection>) -> Result<T, AppError> {
    let Json(value) = body.map_err(|e| {
        AppError(SyncError::validation(
            format!("invalid JSON body: {}", e.body_text()),
            Vec::new(),
        ))
    })?;
    serde_json::from_value(value).map_err(|e| {
        AppError(SyncError::validation(
            format!("invalid request body: {}", e),
            Vec::new(),
        ))
    })
}

fn required<'a>(params: &'a HashMap<String, String>, name: &str) -> Result<&'a str, AppError> {
    params
        .get(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| bad_request(name, "is required"))
}

fn int_param(
    params: &HashMap<String, String>,
    name: &str,
    default: i64,
    range: std::ops::RangeInclusive<i64>,
) -> Result<i64, AppError> {
    let Some(raw) = params.get(name) else {
        return Ok(default);
    };
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| bad_request(name, "must be an integer"))?;
    if !range.contains(&value) {
        return Err(bad_request(
            name,
            format!("must be between {} and {}", range.start(), range.end()),
        ));
    }
    Ok(value)
}

async fn require_blog(state: &AppState, id: &str) -> Result<Blog, AppError> {
    state
        .store()
        .get_blog(id)
        .await?
        .ok_or_else(|| not_found(format!("blog not found: {}", id)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/sync ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest {
    #[serde(default)]
    blog_id: Option<String>,
    #[serde(default)]
    direction: Option<SyncDirection>,
    #[serde(default)]
    post_id: Option<String>,
    #[serde(default)]
    remote_post_id: Option<i64>,
}

#[derive(Serialize)]
struct SyncResponse {
    success: bool,
    results: SyncReport,
}

/// Handler for `POST /api/sync`.
///
/// Runs one pass and returns its report. Item-level failures stay inside the
/// report; only a pass that could not run is an error response.
async fn handle_sync(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SyncResponse>, AppError> {
    let req: SyncRequest = parse_body(body)?;
    let blog_id = req
        .blog_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| bad_request("blogId", "is required"))?;

    let scope = match (req.post_id, req.remote_post_id) {
        (Some(_), Some(_)) => {
            return Err(bad_request(
                "postId",
                "postId and remotePostId are mutually exclusive",
            ))
        }
        (Some(id), None) => SyncScope::LocalPost(id),
        (None, Some(remote_id)) => SyncScope::RemotePost(remote_id),
        (None, None) => SyncScope::All,
    };

    let report = state
        .coordinator
        .synchronize(&blog_id, req.direction.unwrap_or_default(), scope)
        .await?;

    Ok(Json(SyncResponse {
        success: true,
        results: report,
    }))
}

// ============ /api/sync/webhook ============

/// Handler for `POST /api/sync/webhook`.
///
/// Verifies the signature over the raw body when a secret is configured,
/// then applies the delivery.
async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    if let Some(secret) = &state.webhook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        webhook::verify_signature(secret, &body, signature)?;
    }

    let payload: RawWebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        AppError(SyncError::validation(
            format!("invalid webhook payload: {}", e),
            Vec::new(),
        ))
    })?;

    let ack = webhook::handle_webhook(&state.coordinator, &payload).await?;
    Ok(Json(ack))
}

/// Handler for `GET /api/sync/webhook`.
///
/// Echoes `challenge` as `{"challenge": ...}` when present so WordPress
/// plugins can verify the endpoint; otherwise reports liveness.
async fn handle_webhook_verify(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("challenge") {
        Some(challenge) => Json(json!({ "challenge": challenge })).into_response(),
        None => Json(json!({
            "status": "webhook endpoint active",
            "timestamp": Utc::now().to_rfc3339(),
        }))
        .into_response(),
    }
}

// ============ /api/sync/logs ============

/// Handler for `GET /api/sync/logs`.
async fn handle_list_logs(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<SyncLogEntry>>, AppError> {
    let blog_id = required(&params, "blog_id")?;
    let limit = int_param(&params, "limit", DEFAULT_LOG_LIMIT, 1..=MAX_LOG_LIMIT)?;
    let offset = int_param(&params, "offset", 0, 0..=i64::MAX)?;

    require_blog(&state, blog_id).await?;
    let logs = state.store().list_sync_logs(blog_id, limit, offset).await?;
    Ok(Json(logs))
}

#[derive(Deserialize)]
struct AppendLogRequest {
    #[serde(default)]
    blog_id: Option<String>,
    #[serde(default)]
    sync_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

/// Handler for `POST /api/sync/logs`. Returns 201 with the stored entry.
async fn handle_append_log(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<SyncLogEntry>), AppError> {
    let req: AppendLogRequest = parse_body(body)?;

    let mut fields = Vec::new();
    let blog_id = req.blog_id.filter(|s| !s.trim().is_empty());
    if blog_id.is_none() {
        fields.push(FieldError::new("blog_id", "is required"));
    }
    let sync_type = req.sync_type.filter(|s| !s.trim().is_empty());
    if sync_type.is_none() {
        fields.push(FieldError::new("sync_type", "is required"));
    }
    let status = match req.status.as_deref() {
        Some(raw) => match raw.parse::<SyncLogStatus>() {
            Ok(status) => Some(status),
            Err(message) => {
                fields.push(FieldError::new("status", message));
                None
            }
        },
        None => {
            fields.push(FieldError::new("status", "is required"));
            None
        }
    };

    let (Some(blog_id), Some(sync_type), Some(status)) = (blog_id, sync_type, status) else {
        return Err(AppError(SyncError::validation(
            "missing required fields",
            fields,
        )));
    };

    require_blog(&state, &blog_id).await?;
    let entry = state
        .store()
        .append_sync_log(&NewSyncLog {
            blog_id,
            sync_type,
            status,
            details: req.details.unwrap_or_else(|| json!({})),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

// ============ /api/blogs ============

/// Handler for `GET /api/blogs`.
async fn handle_list_blogs(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Blog>>, AppError> {
    let active_only = match params.get("active").map(String::as_str) {
        None | Some("false") | Some("0") => false,
        Some("true") | Some("1") => true,
        Some(_) => return Err(bad_request("active", "must be true or false")),
    };
    let filter = BlogFilter {
        active_only,
        domain: params.get("domain").map(|d| webhook::site_domain(d)),
    };
    Ok(Json(state.store().list_blogs(&filter).await?))
}

/// Handler for `POST /api/blogs`. Returns 201 with the stored blog.
async fn handle_create_blog(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Blog>), AppError> {
    let mut new: NewBlog = parse_body(body)?;

    let mut fields = Vec::new();
    if new.name.trim().is_empty() {
        fields.push(FieldError::new("name", "must not be empty"));
    }
    new.domain = webhook::site_domain(&new.domain);
    if new.domain.is_empty() {
        fields.push(FieldError::new("domain", "must not be empty"));
    }
    check_wp_url(new.wp_api_url.as_deref(), &mut fields);
    if !fields.is_empty() {
        return Err(AppError(SyncError::validation("invalid blog", fields)));
    }

    if state.store().find_blog_by_domain(&new.domain).await?.is_some() {
        return Err(bad_request(
            "domain",
            format!("{} is already registered", new.domain),
        ));
    }

    let blog = state.store().create_blog(&new).await?;
    tracing::info!(blog = %blog.domain, id = %blog.id, "blog registered");
    Ok((StatusCode::CREATED, Json(blog)))
}

fn check_wp_url(url: Option<&str>, fields: &mut Vec<FieldError>) {
    if let Some(url) = url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            fields.push(FieldError::new("wp_api_url", "must be an http(s) URL"));
        }
    }
}

/// Handler for `GET /api/blogs/{id}`.
async fn handle_get_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Blog>, AppError> {
    Ok(Json(require_blog(&state, &id).await?))
}

/// Handler for `PUT /api/blogs/{id}`. Absent fields are left unchanged; the
/// domain is fixed once registered.
async fn handle_update_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Blog>, AppError> {
    let update: BlogUpdate = parse_body(body)?;

    let mut fields = Vec::new();
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        fields.push(FieldError::new("name", "must not be empty"));
    }
    check_wp_url(update.wp_api_url.as_deref(), &mut fields);
    if !fields.is_empty() {
        return Err(AppError(SyncError::validation("invalid blog", fields)));
    }

    let blog = state
        .store()
        .update_blog(&id, &update)
        .await?
        .ok_or_else(|| not_found(format!("blog not found: {}", id)))?;
    tracing::info!(blog = %blog.domain, id = %blog.id, "blog updated");
    Ok(Json(blog))
}

/// Handler for `DELETE /api/blogs/{id}`.
///
/// Deactivates rather than deletes, so posts, media and logs survive and the
/// blog can be re-enabled from the CLI.
async fn handle_deactivate_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Blog>, AppError> {
    if !state.store().set_blog_active(&id, false).await? {
        return Err(not_found(format!("blog not found: {}", id)));
    }
    let blog = require_blog(&state, &id).await?;
    tracing::info!(blog = %blog.domain, id = %blog.id, "blog deactivated");
    Ok(Json(blog))
}

// ============ Posts ============

/// Handler for `GET /api/blogs/{id}/posts`.
async fn handle_list_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ContentPost>>, AppError> {
    require_blog(&state, &id).await?;
    Ok(Json(state.store().list_posts(&id).await?))
}

#[derive(Deserialize)]
struct CreatePostRequest {
    title: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    status: Option<PostStatus>,
}

/// Handler for `POST /api/blogs/{id}/posts`. Creates a local-only post.
async fn handle_create_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ContentPost>), AppError> {
    let req: CreatePostRequest = parse_body(body)?;
    if req.title.trim().is_empty() {
        return Err(bad_request("title", "must not be empty"));
    }
    check_title(&req.title).map_err(|e| bad_request("title", e.to_string()))?;
    require_blog(&state, &id).await?;

    let post = state
        .store()
        .create_post(&NewPost {
            blog_id: id,
            title: req.title,
            slug: req.slug,
            content: req.content,
            excerpt: req.excerpt,
            status: req.status.unwrap_or(PostStatus::Draft),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// Handler for `PATCH /api/posts/{id}`. The edit marks the post for the next push.
async fn handle_edit_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ContentPost>, AppError> {
    let edit: PostEdit = parse_body(body)?;
    if let Some(title) = &edit.title {
        check_title(title).map_err(|e| bad_request("title", e.to_string()))?;
    }
    state
        .store()
        .edit_post(&id, &edit)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("post not found: {}", id)))
}

// ============ /api/keywords ============

/// Handler for `GET /api/keywords`.
async fn handle_list_keywords(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<MainKeyword>>, AppError> {
    let blog_id = required(&params, "blog_id")?;
    require_blog(&state, blog_id).await?;
    Ok(Json(state.store().list_keywords(blog_id).await?))
}

/// Handler for `POST /api/keywords`. Returns 201 with the keyword and its variations.
async fn handle_create_keyword(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<MainKeyword>), AppError> {
    let new: NewKeyword = parse_body(body)?;
    if new.keyword.trim().is_empty() {
        return Err(bad_request("keyword", "must not be empty"));
    }
    if new.variations.iter().any(|v| v.keyword.trim().is_empty()) {
        return Err(bad_request("variations", "keyword must not be empty"));
    }
    require_blog(&state, &new.blog_id).await?;
    let keyword = state.store().create_keyword(&new).await?;
    Ok((StatusCode::CREATED, Json(keyword)))
}

// ============ /api/wordpress ============

fn remote_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| bad_request("id", "must be a positive WordPress id"))
}

#[derive(Serialize)]
struct WpDeleteResponse {
    success: bool,
    /// Whether a local row was soft-deleted alongside.
    matched: bool,
}

/// Handler for `DELETE /api/wordpress/posts/{id}?blog_id=&force=`.
///
/// Trashes the post on WordPress (or deletes it outright with `force=true`)
/// and soft-deletes the matching local row.
async fn handle_wp_delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<WpDeleteResponse>, AppError> {
    let remote_id = remote_id(&id)?;
    let force = match params.get("force").map(String::as_str) {
        None | Some("false") | Some("0") => false,
        Some("true") | Some("1") => true,
        Some(_) => return Err(bad_request("force", "must be true or false")),
    };
    let blog = require_blog(&state, required(&params, "blog_id")?).await?;

    let platform = state.coordinator.open(&blog)?;
    platform.delete_post(remote_id, force).await?;
    let matched = state.store().mark_post_deleted(&blog.id, remote_id).await?;

    tracing::info!(blog = %blog.domain, remote_id, force, matched, "WordPress post deleted");
    Ok(Json(WpDeleteResponse {
        success: true,
        matched,
    }))
}

/// Handler for `GET /api/wordpress/media/{id}?blog_id=`.
async fn handle_wp_get_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<RemoteMedia>, AppError> {
    let remote_id = remote_id(&id)?;
    let blog = require_blog(&state, required(&params, "blog_id")?).await?;
    let platform = state.coordinator.open(&blog)?;
    Ok(Json(platform.get_media(remote_id).await?))
}

// ============ GET /api/dashboard/stats ============

#[derive(Serialize)]
#[serde(untagged)]
enum StatsResponse {
    One(BlogStats),
    All { blogs: Vec<BlogStats> },
}

/// Handler for `GET /api/dashboard/stats`.
///
/// With `blog_id`, returns that blog's counts; otherwise one entry per blog.
async fn handle_stats(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<StatsResponse>, AppError> {
    if let Some(blog_id) = params.get("blog_id") {
        let stats = state
            .store()
            .blog_stats(blog_id)
            .await?
            .ok_or_else(|| not_found(format!("blog not found: {}", blog_id)))?;
        return Ok(Json(StatsResponse::One(stats)));
    }

    let mut blogs = Vec::new();
    for blog in state.store().list_blogs(&BlogFilter::default()).await? {
        if let Some(stats) = state.store().blog_stats(&blog.id).await? {
            blogs.push(stats);
        }
    }
    Ok(Json(StatsResponse::All { blogs }))
}
