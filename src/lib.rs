// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod metrics;
pub mod view;

use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::metrics::Metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::FeedConfig;
pub use crate::feed::{reduce, sort_records, Action, FeedState, FeedStore, LoadStatus, SortField};
pub use crate::ingest::types::{Diagnostic, DiagnosticKind, LoadOutcome, Record, Severity};
pub use crate::ingest::{ingest_bytes, load, load_location};

/// Fetch + ingest `location` in the background and hand the result to the
/// store. Until it finishes the store reports `Loading`. No timeout.
pub fn spawn_initial_load(store: Arc<FeedStore>, location: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = ingest::load_location(&location).await;
        info!(
            target: "ingest",
            %location,
            records = outcome.records.len(),
            errors = outcome.has_errors(),
            "initial load finished"
        );
        store.dispatch(Action::Loaded(outcome));
    })
}

/// Build the router the server binary uses and kick off the initial load.
/// Must be called inside a Tokio runtime.
pub fn app(cfg: &FeedConfig) -> Router {
    let store = Arc::new(FeedStore::new(FeedState::loading(cfg.feed.default_sort)));
    spawn_initial_load(store.clone(), cfg.source.location.clone());
    api::create_router(AppState::new(store), &cfg.server.static_dir)
}

/// [`app`] plus `/metrics`. The Prometheus recorder is installed before the
/// initial load starts so its counters land in the exporter.
pub fn app_with_metrics(cfg: &FeedConfig) -> Router {
    let metrics = Metrics::init()
        .map_err(|e| warn!(error = ?e, "metrics disabled"))
        .ok();
    let router = app(cfg);
    match metrics {
        Some(m) => router.merge(m.router()),
        None => router,
    }
}
