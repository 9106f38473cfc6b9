use axum::extract::State;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use basematch_shared::extract::{Json, Path};
use basematch_shared::types::ApiResponse;
use basematch_shared::{normalize_address, AppResult};

use crate::services::matching;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestRequest {
    pub from_address: String,
    pub to_address: String,
}

#[derive(Debug, Serialize)]
pub struct InterestBody {
    pub matched: bool,
}

pub async fn express_interest(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InterestRequest>,
) -> AppResult<Json<ApiResponse<InterestBody>>> {
    let from = normalize_address(&req.from_address)?;
    let to = normalize_address(&req.to_address)?;

    let outcome = matching::express_interest(state.store.as_ref(), &from, &to).await?;
    Ok(Json(ApiResponse::ok_with_message(
        InterestBody { matched: outcome.matched() },
        outcome.message(),
    )))
}

#[derive(Debug, Serialize)]
pub struct RemoveBody {
    pub removed: usize,
}

pub async fn remove_match(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InterestRequest>,
) -> AppResult<Json<ApiResponse<RemoveBody>>> {
    let from = normalize_address(&req.from_address)?;
    let to = normalize_address(&req.to_address)?;

    let removed = matching::remove_match(state.store.as_ref(), &from, &to).await?;
    Ok(Json(ApiResponse::ok(RemoveBody { removed })))
}

#[derive(Debug, Serialize)]
pub struct MatchesBody {
    pub matches: Vec<String>,
}

pub async fn list_matches(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> AppResult<Json<ApiResponse<MatchesBody>>> {
    let address = normalize_address(&address)?;
    let matches = matching::mutual_matches(state.store.as_ref(), &address).await?;
    Ok(Json(ApiResponse::ok(MatchesBody { matches })))
}
