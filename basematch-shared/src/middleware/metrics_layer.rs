use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Records request count and latency per matched route.
pub async fn metrics_middleware(
    matched_path: Option<MatchedPath>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // Label by route template, never the raw URI.
    let route = matched_path
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = req.method().as_str().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    let labels = [
        ("method", method),
        ("route", route),
        ("status", response.status().as_u16().to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(started.elapsed().as_secs_f64());

    response
}

pub fn record_match_created() {
    counter!("matches_created_total").increment(1);
}

pub fn record_stake_transition(status: &str) {
    counter!("stakes_transitioned_total", "status" => status.to_owned()).increment(1);
}

pub fn record_notification_created(kind: &str) {
    counter!("notifications_created_total", "type" => kind.to_owned()).increment(1);
}

pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("prometheus recorder installed");
    Ok(handle)
}
