//! HTTP routes for the server.

use crate::{
    error::{ServerError, ServerResult},
    mirror::GitHubMirror,
    state::AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

const INDEX_HTML: &str = include_str!("../assets/index.html");
const APP_JS: &str = include_str!("../assets/app.js");

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let site_files = Router::new()
        .fallback_service(ServeDir::new(state.site.layout().live_dir()))
        .layer(middleware::from_fn(hide_dot_paths));

    Router::new()
        // Editor UI
        .route("/", get(index))
        .route("/app.js", get(app_js))
        .route("/health", get(health))
        // Edit lifecycle
        .route("/generate", post(generate))
        .route("/preview", get(preview_list))
        .route("/preview/diff", get(preview_diff))
        .route("/discard", post(discard))
        .route("/publish", post(publish))
        // History
        .route("/history", get(history))
        .route("/history/{version}", get(history_get))
        .route("/history/{version}/diff", get(history_diff))
        .route("/rollback", post(rollback))
        .nest_service("/site", site_files)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Refuse static paths with a segment starting with a dot.
///
/// The snapshot archive lives in `.history` under the served directory.
async fn hide_dot_paths(request: Request, next: Next) -> Response {
    let hidden = request.uri().path().split('/').any(|segment| {
        segment.starts_with('.') || segment.to_ascii_lowercase().starts_with("%2e")
    });
    if hidden {
        debug!(path = %request.uri().path(), "Refusing hidden static path");
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

// =============================================================================
// Request/response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RollbackRequest {
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiffQuery {
    file: Option<String>,
}

#[derive(Debug, Serialize)]
struct PublishResponse {
    ok: bool,
    version: String,
    promoted: Vec<String>,
}

/// Unwrap a JSON body, reporting malformed bodies as validation errors.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ServerResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServerError::validation(rejection.body_text()))
}

/// Treat a missing or blank string field as absent.
fn required(value: Option<String>, message: &str) -> ServerResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ServerError::validation(message))
}

// =============================================================================
// Handlers
// =============================================================================

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn app_js() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/javascript")], APP_JS)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let request = body(payload)?;
    let prompt = request.prompt.unwrap_or_default();

    let outcome = state.gateway.generate(&prompt).await?;
    Ok(Json(json!({
        "ok": true,
        "staged": outcome.staged,
        "ignored": outcome.ignored,
    })))
}

async fn preview_list(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    let files = state.site.pending().await?;
    Ok(Json(json!({ "files": files })))
}

async fn preview_diff(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    let diffs: BTreeMap<String, String> = state.site.preview_diffs().await?;
    Ok(Json(json!({ "diffs": diffs })))
}

async fn discard(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    let discarded = state.site.discard().await?;
    Ok(Json(json!({ "ok": true, "discarded": discarded })))
}

async fn publish(State(state): State<AppState>) -> ServerResult<Json<PublishResponse>> {
    let outcome = state.site.publish().await?;
    let version = outcome.version.to_string();
    info!(version = %version, promoted = ?outcome.promoted, "Publish complete");

    if let Some(mirror) = &state.mirror {
        if !outcome.promoted_content.is_empty() {
            spawn_mirror(mirror.clone(), outcome.promoted_content, version.clone());
        }
    }

    Ok(Json(PublishResponse {
        ok: true,
        version,
        promoted: outcome.promoted,
    }))
}

/// Push promoted files to GitHub in the background. Failures are logged.
fn spawn_mirror(mirror: Arc<GitHubMirror>, files: Vec<(String, Vec<u8>)>, version: String) {
    tokio::spawn(async move {
        if let Err(e) = mirror.commit(&files, &format!("AI publish {version}")).await {
            warn!(version = %version, error = %e, "GitHub mirror failed");
        }
    });
}

async fn history(State(state): State<AppState>) -> ServerResult<Json<Vec<String>>> {
    let versions = state.site.history().await?;
    Ok(Json(versions.into_iter().map(String::from).collect()))
}

async fn history_get(
    State(state): State<AppState>,
    Path(version): Path<String>,
) -> ServerResult<Json<evolve_site::Snapshot>> {
    Ok(Json(state.site.snapshot(&version).await?))
}

async fn history_diff(
    State(state): State<AppState>,
    Path(version): Path<String>,
    Query(query): Query<DiffQuery>,
) -> ServerResult<Json<Value>> {
    let file = required(query.file, "Missing file")?;
    let diff = state.site.snapshot_diff(&version, &file).await?;
    Ok(Json(json!({ "version": version, "file": file, "diff": diff })))
}

async fn rollback(
    State(state): State<AppState>,
    payload: Result<Json<RollbackRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let request = body(payload)?;
    let version = required(request.version, "Missing version")?;

    let snapshot = state.site.rollback(version.trim()).await?;
    info!(version = %snapshot.id, "Rollback complete");
    Ok(Json(json!({ "ok": true, "restored": snapshot.files })))
}
