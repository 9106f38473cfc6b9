use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use basematch_shared::extract::{Json, Query};
use basematch_shared::types::ApiResponse;
use basematch_shared::{normalize_address, AppError, AppResult, ErrorCode};

use crate::models::{ChatMessage, NewChatMessage};
use crate::store::{ChatRepository, InterestRepository, Store};
use crate::AppState;

pub const MAX_MESSAGE_CHARS: usize = 4000;
const CONVERSATION_LIMIT: i64 = 200;

async fn ensure_matched(store: &dyn Store, a: &str, b: &str) -> AppResult<()> {
    if store.interest_exists(a, b).await? && store.interest_exists(b, a).await? {
        Ok(())
    } else {
        Err(AppError::new(
            ErrorCode::NotMatched,
            "Chat is only available between matched users",
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub from_address: String,
    pub to_address: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: ChatMessage,
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<MessageBody>>)> {
    let from = normalize_address(&req.from_address)?;
    let to = normalize_address(&req.to_address)?;

    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::new(ErrorCode::MessageEmpty, "Message content is required"));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::new(
            ErrorCode::MessageTooLong,
            format!("Message must be at most {MAX_MESSAGE_CHARS} characters"),
        ));
    }

    ensure_matched(state.store.as_ref(), &from, &to).await?;

    let message = state
        .store
        .insert_message(NewChatMessage {
            sender_address: from,
            recipient_address: to,
            content: content.to_string(),
        })
        .await?;
    tracing::debug!(message_id = %message.id, "chat message stored");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(MessageBody { message }))))
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub address: String,
    pub peer: String,
}

#[derive(Debug, Serialize)]
pub struct MessagesBody {
    pub messages: Vec<ChatMessage>,
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConversationQuery>,
) -> AppResult<Json<ApiResponse<MessagesBody>>> {
    let address = normalize_address(&query.address)?;
    let peer = normalize_address(&query.peer)?;

    ensure_matched(state.store.as_ref(), &address, &peer).await?;

    let messages = state
        .store
        .conversation(&address, &peer, CONVERSATION_LIMIT)
        .await?;
    Ok(Json(ApiResponse::ok(MessagesBody { messages })))
}
