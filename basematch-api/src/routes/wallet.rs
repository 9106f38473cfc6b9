use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use basematch_shared::extract::Json;
use basematch_shared::types::ApiResponse;
use basematch_shared::{normalize_address, normalize_email, AppResult};

use crate::models::Profile;
use crate::services::wallet::{self, SignatureProof};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRequest {
    pub email: String,
    pub wallet_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceBody {
    pub token: String,
    pub nonce: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn issue_nonce(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WalletRequest>,
) -> AppResult<Json<ApiResponse<NonceBody>>> {
    let email = normalize_email(&req.email)?;
    let wallet = normalize_address(&req.wallet_address)?;

    let issued = wallet::issue_nonce(state.store.as_ref(), &email, &wallet).await?;
    Ok(Json(ApiResponse::ok(NonceBody {
        token: issued.token,
        nonce: issued.nonce,
        message: issued.message,
        expires_at: issued.expires_at,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySignatureRequest {
    pub token: String,
    pub email: String,
    pub wallet_address: String,
    pub message: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBody {
    pub user_id: Uuid,
    pub wallet_address: String,
}

pub async fn verify_wallet_signature(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifySignatureRequest>,
) -> AppResult<Json<ApiResponse<WalletBody>>> {
    let email = normalize_email(&req.email)?;
    let wallet = normalize_address(&req.wallet_address)?;

    let user = wallet::verify_signature(
        state.store.as_ref(),
        SignatureProof {
            token: req.token.trim(),
            email: &email,
            wallet: &wallet,
            message: &req.message,
            signature: &req.signature,
        },
        Utc::now(),
    )
    .await?;

    Ok(Json(ApiResponse::ok_with_message(
        WalletBody { user_id: user.id, wallet_address: wallet },
        "Wallet verified successfully",
    )))
}

pub async fn connect_wallet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WalletRequest>,
) -> AppResult<Json<ApiResponse<WalletBody>>> {
    let email = normalize_email(&req.email)?;
    let wallet = normalize_address(&req.wallet_address)?;

    let user = wallet::connect_wallet(state.store.as_ref(), &email, &wallet).await?;
    Ok(Json(ApiResponse::ok_with_message(
        WalletBody { user_id: user.id, wallet_address: wallet },
        "Wallet connected",
    )))
}

#[derive(Debug, Serialize)]
pub struct LinkedProfileBody {
    pub profile: Profile,
}

pub async fn link_profile_wallet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WalletRequest>,
) -> AppResult<Json<ApiResponse<LinkedProfileBody>>> {
    let email = normalize_email(&req.email)?;
    let wallet = normalize_address(&req.wallet_address)?;

    let profile = wallet::link_profile_wallet(state.store.as_ref(), &email, &wallet).await?;
    Ok(Json(ApiResponse::ok_with_message(
        LinkedProfileBody { profile },
        "Wallet linked to profile",
    )))
}
