use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use basematch_shared::extract::{Json, Query};
use basematch_shared::types::pagination::{Paginated, PaginationParams};
use basematch_shared::types::ApiResponse;
use basematch_shared::{normalize_address, AppResult};

use crate::models::Notification;
use crate::routes::validate;
use crate::services::notifications;
use crate::store::NotificationRepository;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub address: String,
    #[serde(default, rename = "unreadOnly")]
    pub unread_only: bool,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<Notification>>>> {
    let address = normalize_address(&query.address)?;
    let params = PaginationParams::new(query.page, query.per_page);

    let (items, total) = state
        .store
        .notifications_for(
            &address,
            query.unread_only,
            params.limit() as i64,
            params.offset() as i64,
        )
        .await?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total, &params))))
}

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct CountBody {
    pub count: u64,
}

pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AddressQuery>,
) -> AppResult<Json<ApiResponse<CountBody>>> {
    let address = normalize_address(&query.address)?;
    let count = state.store.unread_count(&address).await?;
    Ok(Json(ApiResponse::ok(CountBody { count })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_address: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub notification_type: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct NotificationBody {
    pub notification: Notification,
}

pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNotificationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<NotificationBody>>)> {
    validate(&req)?;
    let address = normalize_address(&req.user_address)?;

    let notification = notifications::create_notification(
        state.store.as_ref(),
        &address,
        &req.notification_type,
        &req.title,
        &req.message,
        req.metadata,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(NotificationBody { notification })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub user_address: String,
    pub notification_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedBody {
    pub updated: usize,
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MarkReadRequest>,
) -> AppResult<Json<ApiResponse<UpdatedBody>>> {
    let address = normalize_address(&req.user_address)?;

    let updated = state
        .store
        .mark_read(&address, req.notification_ids.as_deref())
        .await?;
    tracing::debug!(address = %address, updated, "notifications marked read");

    Ok(Json(ApiResponse::ok(UpdatedBody { updated })))
}

#[derive(Debug, Serialize)]
pub struct DeletedBody {
    pub deleted: usize,
}

pub async fn delete_read(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AddressQuery>,
) -> AppResult<Json<ApiResponse<DeletedBody>>> {
    let address = normalize_address(&query.address)?;
    let deleted = state.store.delete_read(&address).await?;
    Ok(Json(ApiResponse::ok(DeletedBody { deleted })))
}
