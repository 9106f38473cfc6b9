use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use basematch_shared::extract::{Json, Path};
use basematch_shared::types::ApiResponse;
use basematch_shared::{normalize_address, normalize_email, AppResult};

use crate::models::{Profile, ProfileChanges};
use crate::routes::{optional_address, optional_email, validate};
use crate::services::profiles::{self, ProfileView, Registration, VerificationStatus};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub address: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "name must be at most 100 characters"))]
    pub name: String,
    #[validate(range(min = 1900, max = 2100, message = "birthYear is out of range"))]
    pub birth_year: Option<i32>,
    #[validate(length(max = 50))]
    pub gender: Option<String>,
    #[validate(length(max = 1000))]
    pub interests: Option<String>,
    #[validate(url(message = "photoUrl must be a URL"))]
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileBody {
    pub profile: Profile,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProfileBody>>)> {
    validate(&req)?;

    let profile = profiles::register(
        state.store.as_ref(),
        Registration {
            address: optional_address(req.address.as_deref())?,
            email: optional_email(req.email.as_deref())?,
            name: req.name.trim().to_string(),
            birth_year: req.birth_year,
            gender: req.gender,
            interests: req.interests,
            photo_url: req.photo_url,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(ProfileBody { profile }, "Profile registered")),
    ))
}

#[derive(Debug, Serialize)]
pub struct ProfileLookupBody {
    pub profile: ProfileView,
    pub source: &'static str,
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> AppResult<Json<ApiResponse<ProfileLookupBody>>> {
    let address = normalize_address(&address)?;
    let profile = profiles::lookup(state.store.as_ref(), state.chain.as_ref(), &address).await?;

    Ok(Json(ApiResponse::ok(ProfileLookupBody {
        source: profile.source(),
        profile,
    })))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Json(changes): Json<ProfileChanges>,
) -> AppResult<Json<ApiResponse<ProfileBody>>> {
    let address = normalize_address(&address)?;
    validate(&changes)?;

    let profile = profiles::update_by_address(state.store.as_ref(), &address, changes).await?;
    Ok(Json(ApiResponse::ok_with_message(ProfileBody { profile }, "Profile updated")))
}

#[derive(Debug, Deserialize)]
pub struct UpdateByEmailRequest {
    pub email: String,
    #[serde(flatten)]
    pub changes: ProfileChanges,
}

pub async fn update_by_email(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateByEmailRequest>,
) -> AppResult<Json<ApiResponse<ProfileBody>>> {
    let email = normalize_email(&req.email)?;
    validate(&req.changes)?;

    let profile = profiles::update_by_email(state.store.as_ref(), &email, req.changes).await?;
    Ok(Json(ApiResponse::ok_with_message(ProfileBody { profile }, "Profile updated")))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub address: Option<String>,
    pub email: Option<String>,
}

pub async fn verification_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StatusRequest>,
) -> AppResult<Json<ApiResponse<VerificationStatus>>> {
    let address = optional_address(req.address.as_deref())?;
    let email = optional_email(req.email.as_deref())?;

    let status = profiles::verification_status(
        state.store.as_ref(),
        state.chain.as_ref(),
        address.as_deref(),
        email.as_deref(),
    )
    .await?;

    Ok(Json(ApiResponse::ok(status)))
}
