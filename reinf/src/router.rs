use std::future::ready;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::Catalog;
use crate::endpoint;
use crate::prometheus::track_metrics;
use crate::stores::RecordStore;

/// Events are single records, anything larger than this is refused before parsing.
const MAX_BODY_SIZE: usize = 1024 * 1024;

#[derive(Clone)]
pub struct State {
    pub store: Arc<dyn RecordStore + Send + Sync>,
    pub catalog: Arc<Catalog>,
}

async fn index() -> &'static str {
    "reinf"
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Build the service routes. `metrics` is only passed when a global recorder was installed,
/// installing one when used as a library (during tests etc) does not work well.
pub fn router<S: RecordStore + Send + Sync + 'static>(
    store: S,
    catalog: Catalog,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let state = State {
        store: Arc::new(store),
        catalog: Arc::new(catalog),
    };

    let router = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/validar", post(endpoint::validate_event))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    match metrics {
        Some(recorder_handle) => {
            router.route("/metrics", get(move || ready(recorder_handle.render())))
        }
        None => router,
    }
}
