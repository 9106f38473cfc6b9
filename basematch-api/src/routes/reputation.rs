use axum::extract::State;
use serde::Serialize;
use std::sync::Arc;

use basematch_shared::extract::{Json, Path};
use basematch_shared::clients::chain::ChainError;
use basematch_shared::types::ApiResponse;
use basematch_shared::{normalize_address, AppError, AppResult, ErrorCode};

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ReputationBody {
    pub address: String,
    pub score: u64,
}

pub async fn get_reputation(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> AppResult<Json<ApiResponse<ReputationBody>>> {
    let address = normalize_address(&address)?;

    let score = state.chain.reputation_of(&address).await.map_err(|e| {
        tracing::warn!(error = %e, address = %address, "reputation lookup failed");
        match e {
            ChainError::NotConfigured(_) => {
                AppError::new(ErrorCode::ServiceUnavailable, "Reputation contract is not configured")
            }
            _ => AppError::new(ErrorCode::ServiceUnavailable, "Failed to read reputation"),
        }
    })?;

    Ok(Json(ApiResponse::ok(ReputationBody { address, score })))
}
