use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::feed::{Action, FeedStore, LoadStatus, SortField, UnknownSortField};
use crate::ingest::types::{Diagnostic, IngestStats, Record};
use crate::view::{feed_view, render_html, FeedView};

#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<FeedStore>,
}

impl AppState {
    pub fn new(feed: Arc<FeedStore>) -> Self {
        Self { feed }
    }
}

/// Feed routes plus `/static` (CSV, stylesheet) served from `static_dir`.
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/", get(index))
        .route("/feed", get(feed))
        .route("/feed/records", get(records))
        .route("/feed/sort", post(sort))
        .route("/feed/diagnostics", get(diagnostics))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

impl From<UnknownSortField> for ApiError {
    fn from(e: UnknownSortField) -> Self {
        Self(StatusCode::BAD_REQUEST, e.to_string())
    }
}

#[derive(Deserialize)]
struct SortQuery {
    sort: Option<String>,
}

#[derive(Deserialize)]
struct SortReq {
    field: String,
}

#[derive(Serialize)]
struct DiagnosticsOut {
    status: LoadStatus,
    stats: IngestStats,
    diagnostics: Vec<Diagnostic>,
}

fn apply_sort(state: &AppState, raw: Option<&str>) -> Result<(), ApiError> {
    if let Some(raw) = raw {
        let field: SortField = raw.parse()?;
        state.feed.dispatch(Action::SortBy(field));
    }
    Ok(())
}

async fn index(
    State(state): State<AppState>,
    Query(q): Query<SortQuery>,
) -> Result<Html<String>, ApiError> {
    apply_sort(&state, q.sort.as_deref())?;
    let now = Utc::now();
    Ok(Html(state.feed.read(|s| render_html(s, now))))
}

async fn feed(
    State(state): State<AppState>,
    Query(q): Query<SortQuery>,
) -> Result<Json<FeedView>, ApiError> {
    apply_sort(&state, q.sort.as_deref())?;
    let now = Utc::now();
    Ok(Json(state.feed.read(|s| feed_view(s, now))))
}

async fn records(State(state): State<AppState>) -> Json<Vec<Record>> {
    Json(state.feed.read(|s| s.records.clone()))
}

async fn sort(
    State(state): State<AppState>,
    Json(body): Json<SortReq>,
) -> Result<Json<FeedView>, ApiError> {
    apply_sort(&state, Some(&body.field))?;
    let now = Utc::now();
    Ok(Json(state.feed.read(|s| feed_view(s, now))))
}

async fn diagnostics(State(state): State<AppState>) -> Json<DiagnosticsOut> {
    Json(state.feed.read(|s| DiagnosticsOut {
        status: s.status,
        stats: s.stats,
        diagnostics: s.diagnostics.clone(),
    }))
}
