use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use basematch_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::store::Store;
use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let database = match state.store.ping().await {
        Ok(()) => HealthCheck {
            name: "database".into(),
            status: HealthStatus::Healthy,
            message: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "database health check failed");
            HealthCheck {
                name: "database".into(),
                status: HealthStatus::Unhealthy,
                message: Some("database unreachable".into()),
            }
        }
    };

    let health = HealthResponse::healthy("basematch-api", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![database]);
    let status = if health.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status, Json(health))
}

pub async fn render_metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
