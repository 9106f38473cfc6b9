use axum::extract::State;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use basematch_shared::extract::{Json, Path};
use basematch_shared::types::ApiResponse;
use basematch_shared::{normalize_address, AppError, AppResult};

use crate::models::Stake;
use crate::services::stakes::{self, CreateOutcome, NewStakeRequest};
use crate::services::unix_now;
use crate::AppState;

/// Contract values arrive as JSON numbers or as decimal strings (bigints).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Int(u64),
    Text(String),
}

impl Numeric {
    fn decimal(&self) -> String {
        match self {
            Numeric::Int(n) => n.to_string(),
            Numeric::Text(s) => s.trim().to_string(),
        }
    }

    fn to_i64(&self, field: &str) -> AppResult<i64> {
        self.decimal()
            .parse::<i64>()
            .map_err(|_| AppError::bad_request(format!("{field} must be an integer")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStakeRequest {
    pub stake_id: Numeric,
    pub user_address: String,
    pub match_address: String,
    pub stake_amount: Numeric,
    pub meeting_timestamp: Numeric,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStakeBody {
    pub stake_id: i64,
}

pub async fn create_stake(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStakeRequest>,
) -> AppResult<Json<ApiResponse<CreateStakeBody>>> {
    let stake_id = req.stake_id.to_i64("stakeId")?;
    let request = NewStakeRequest {
        stake_id,
        creator: normalize_address(&req.user_address)?,
        invitee: normalize_address(&req.match_address)?,
        amount: req.stake_amount.decimal(),
        meeting_time: req.meeting_timestamp.to_i64("meetingTimestamp")?,
    };

    let outcome = stakes::create_stake(state.store.as_ref(), state.chain.as_ref(), request).await?;
    let message = match outcome {
        CreateOutcome::Created(_) => "Stake created successfully",
        CreateOutcome::AlreadyExists => "Stake already exists",
    };

    Ok(Json(ApiResponse::ok_with_message(CreateStakeBody { stake_id }, message)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelStakeRequest {
    pub stake_id: Numeric,
    pub user_address: String,
    #[serde(default)]
    pub expired: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: String,
}

pub async fn cancel_stake(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CancelStakeRequest>,
) -> AppResult<Json<ApiResponse<StatusBody>>> {
    let stake_id = req.stake_id.to_i64("stakeId")?;
    let caller = normalize_address(&req.user_address)?;

    let stake = stakes::cancel_stake(state.store.as_ref(), stake_id, &caller, req.expired, unix_now())
        .await?;
    let message = format!("Stake {}", stake.status);

    Ok(Json(ApiResponse::ok_with_message(StatusBody { status: stake.status }, message)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptStakeRequest {
    pub stake_id: Numeric,
    pub user_address: String,
    pub stake_amount: Numeric,
}

#[derive(Debug, Serialize)]
pub struct StakeBody {
    pub stake: Stake,
}

pub async fn accept_stake(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AcceptStakeRequest>,
) -> AppResult<Json<ApiResponse<StakeBody>>> {
    let stake_id = req.stake_id.to_i64("stakeId")?;
    let caller = normalize_address(&req.user_address)?;

    let stake =
        stakes::accept_stake(state.store.as_ref(), stake_id, &caller, &req.stake_amount.decimal())
            .await?;
    Ok(Json(ApiResponse::ok_with_message(StakeBody { stake }, "Stake accepted")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmMeetingRequest {
    pub stake_id: Numeric,
    pub user_address: String,
}

pub async fn confirm_meeting(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmMeetingRequest>,
) -> AppResult<Json<ApiResponse<StakeBody>>> {
    let stake_id = req.stake_id.to_i64("stakeId")?;
    let caller = normalize_address(&req.user_address)?;

    let stake = stakes::confirm_meeting(state.store.as_ref(), stake_id, &caller, unix_now()).await?;
    Ok(Json(ApiResponse::ok_with_message(StakeBody { stake }, "Meeting confirmed")))
}

pub async fn get_stake(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<StakeBody>>> {
    let stake = stakes::get_stake(state.store.as_ref(), id).await?;
    Ok(Json(ApiResponse::ok(StakeBody { stake })))
}

#[derive(Debug, Serialize)]
pub struct StakesBody {
    pub stakes: Vec<Stake>,
}

pub async fn list_user_stakes(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> AppResult<Json<ApiResponse<StakesBody>>> {
    let address = normalize_address(&address)?;
    let stakes = stakes::stakes_for(state.store.as_ref(), &address).await?;
    Ok(Json(ApiResponse::ok(StakesBody { stakes })))
}
