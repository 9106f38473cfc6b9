use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use basematch_shared::extract::Json;
use basematch_shared::types::ApiResponse;
use basematch_shared::{normalize_address, short_address, AppError, AppResult};

use crate::models::Notification;
use crate::routes::validate;
use crate::services::notifications::{self, kind};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendGiftRequest {
    pub from_address: String,
    pub to_address: String,
    #[validate(length(min = 1, max = 50, message = "giftType is required"))]
    pub gift_type: String,
    pub amount: Option<String>,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GiftBody {
    pub notification: Notification,
}

/// Record a gift by notifying its recipient. The notification is the only
/// record of the gift, so a failed insert fails the request.
pub async fn send_gift(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendGiftRequest>,
) -> AppResult<Json<ApiResponse<GiftBody>>> {
    validate(&req)?;
    let from = normalize_address(&req.from_address)?;
    let to = normalize_address(&req.to_address)?;
    if from == to {
        return Err(AppError::bad_request("cannot send a gift to yourself"));
    }

    let sender_name = notifications::display_name(state.store.as_ref(), &from)
        .await
        .unwrap_or_else(|| short_address(&from));
    let gift_type = req.gift_type.trim();

    let notification = notifications::create_notification(
        state.store.as_ref(),
        &to,
        kind::GIFT,
        "You received a gift!",
        &format!("{sender_name} sent you a {gift_type}"),
        Some(json!({
            "fromAddress": from,
            "fromName": sender_name,
            "giftType": gift_type,
            "amount": req.amount,
            "txHash": req.tx_hash,
        })),
    )
    .await?;

    tracing::info!(from = %from, to = %to, gift_type = %gift_type, "gift sent");
    Ok(Json(ApiResponse::ok_with_message(
        GiftBody { notification },
        "Gift sent",
    )))
}
