use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::events::EventType;
use crate::stores::InsertOutcome;

pub fn report_received_event(event: EventType) {
    counter!("reinf_events_received_total", "event" => event.as_str()).increment(1);
}

/// `phase` is `dispatch` when no event type could be read, else the validation phase.
pub fn report_rejected_event(event: &'static str, phase: &'static str) {
    counter!("reinf_events_rejected_total", "event" => event, "phase" => phase).increment(1);
}

pub fn report_insert(event: EventType, outcome: InsertOutcome) {
    let name = match outcome {
        InsertOutcome::Inserted => "reinf_records_inserted_total",
        InsertOutcome::AlreadyExists => "reinf_records_duplicate_total",
    };
    counter!(name, "event" => event.as_str()).increment(1);
}

pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(EXPONENTIAL_SECONDS)?
        .install_recorder()
}

/// Middleware to record some common HTTP metrics
pub async fn track_metrics(req: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();

    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };

    let method = req.method().clone();

    // Run the rest of the request handling first, so we can measure it and get response
    // codes.
    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", status),
    ];

    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_seconds", &labels).record(latency);

    response
}
