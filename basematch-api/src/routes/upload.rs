use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use basematch_shared::types::ApiResponse;
use basematch_shared::{AppError, AppResult, ErrorCode};

use crate::AppState;

pub const MAX_IMAGE_BYTES: usize = 3 * 1024 * 1024;

/// Request body cap for the upload route, multipart framing included.
pub const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// `3_670_016` -> `"3.50 MB"`.
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let bytes = bytes as f64;
    if bytes >= MB {
        format!("{:.2} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes / KB)
    } else {
        format!("{bytes} B")
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct UploadBody {
    pub url: String,
}

fn too_large(bytes: usize) -> AppError {
    let size = format_size(bytes);
    let max = format_size(MAX_IMAGE_BYTES);
    AppError::with_details(
        ErrorCode::ImageTooLarge,
        format!("Image is {size}; the limit is {max}"),
        json!({ "size": size, "maxSize": max }),
    )
}

pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<UploadBody>>> {
    // The body limit would cut the read short, so answer from the header.
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if let Some(len) = declared.filter(|len| *len > UPLOAD_BODY_LIMIT) {
        return Err(too_large(len));
    }

    let mut field = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| AppError::bad_request(format!("failed to read multipart: {e}")))?
            .ok_or_else(|| AppError::bad_request("no file provided"))?;
        if field.name() == Some("file") {
            break field;
        }
    };

    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let ext = extension_for(&content_type).ok_or_else(|| {
        AppError::new(
            ErrorCode::UnsupportedImageType,
            "unsupported image format, accepted: jpeg, png, webp, gif",
        )
    })?;

    // Stop buffering past the limit but keep counting for the error message.
    let mut data = Vec::new();
    let mut total = 0usize;
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                total += chunk.len();
                if total <= MAX_IMAGE_BYTES {
                    data.extend_from_slice(&chunk);
                }
            }
            Ok(None) => break,
            Err(_) if total > MAX_IMAGE_BYTES => break,
            Err(e) => return Err(AppError::bad_request(format!("failed to read file data: {e}"))),
        }
    }
    if total > MAX_IMAGE_BYTES {
        return Err(too_large(total));
    }

    let key = format!("profiles/{}.{}", Uuid::now_v7(), ext);
    let url = state
        .storage
        .put(&key, data, &content_type)
        .await
        .map_err(|e| AppError::new(ErrorCode::UploadFailed, format!("upload failed: {e}")))?;

    tracing::info!(key = %key, bytes = total, "image uploaded");
    Ok(Json(ApiResponse::ok(UploadBody { url })))
}
