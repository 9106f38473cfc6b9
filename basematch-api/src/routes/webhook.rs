//! Inbound mini-app webhook (Farcaster frame lifecycle events).
//!
//! Deliveries are authenticated with `x-webhook-signature`: the hex
//! HMAC-SHA256 of the raw request body under the shared webhook secret.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

use basematch_shared::types::ApiResponse;
use basematch_shared::{AppError, AppResult, ErrorCode};

use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

pub fn sign_body(secret: &str, body: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::internal(format!("invalid webhook secret: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify_body(secret: &str, body: &[u8], signature: &str) -> AppResult<()> {
    let invalid = || AppError::new(ErrorCode::WebhookSignatureInvalid, "Invalid webhook signature");

    let signature = signature.trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
    let expected = hex::decode(signature).map_err(|_| invalid())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::internal(format!("invalid webhook secret: {e}")))?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| invalid())
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    fid: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct WebhookBody {
    pub event: String,
}

pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookBody>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::new(ErrorCode::WebhookSignatureMissing, "Missing webhook signature")
        })?;
    verify_body(&state.config.webhook_secret, &body, signature)?;

    let envelope: WebhookEnvelope = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("invalid webhook payload: {e}")))?;
    let fid = envelope.fid.unwrap_or_default();

    match envelope.event_type.as_str() {
        "frame_added" => tracing::info!(fid, "frame added"),
        "frame_removed" => tracing::info!(fid, "frame removed"),
        "notifications_enabled" => tracing::info!(fid, "notifications enabled"),
        "notifications_disabled" => tracing::info!(fid, "notifications disabled"),
        other => {
            return Err(AppError::new(
                ErrorCode::UnknownWebhookEvent,
                format!("Unknown webhook event type: {other}"),
            ));
        }
    }

    Ok(Json(ApiResponse::ok(WebhookBody { event: envelope.event_type })))
}
