use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Profile and wallet binding errors
/// - E2xxx: Email and signature verification errors
/// - E3xxx: Matching and chat errors
/// - E4xxx: Stake errors
/// - E5xxx: Notification errors
/// - E6xxx: Upload errors
/// - E7xxx: Webhook errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServiceUnavailable,
    BadRequest,
    PayloadTooLarge,
    Conflict,

    // Profile / wallet (E1xxx)
    ProfileNotFound,
    ProfileAlreadyExists,
    InvalidAddress,
    InvalidEmail,
    WalletAlreadyLinked,

    // Verification (E2xxx)
    VerificationTokenInvalid,
    VerificationTokenExpired,
    EmailRateLimited,
    EmailDeliveryFailed,
    SignatureInvalid,
    NonceMissing,
    NonceInvalid,
    NonceExpired,

    // Matching / chat (E3xxx)
    CannotMatchSelf,
    NotMatched,
    MessageEmpty,
    MessageTooLong,

    // Stakes (E4xxx)
    StakeNotFound,
    NotStakeCreator,
    NotStakeParticipant,
    StakeAlreadyAccepted,
    StakeNotPending,
    StakeNotAccepted,
    MeetingNotStarted,

    // Notification (E5xxx)
    NotificationNotFound,

    // Upload (E6xxx)
    ImageTooLarge,
    UnsupportedImageType,
    UploadFailed,

    // Webhook (E7xxx)
    WebhookSignatureMissing,
    WebhookSignatureInvalid,
    UnknownWebhookEvent,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::RateLimited => "E0006",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",
            Self::PayloadTooLarge => "E0009",
            Self::Conflict => "E0010",

            // Profile / wallet
            Self::ProfileNotFound => "E1001",
            Self::ProfileAlreadyExists => "E1002",
            Self::InvalidAddress => "E1003",
            Self::InvalidEmail => "E1004",
            Self::WalletAlreadyLinked => "E1005",

            // Verification
            Self::VerificationTokenInvalid => "E2001",
            Self::VerificationTokenExpired => "E2002",
            Self::EmailRateLimited => "E2003",
            Self::EmailDeliveryFailed => "E2004",
            Self::SignatureInvalid => "E2005",
            Self::NonceMissing => "E2006",
            Self::NonceInvalid => "E2007",
            Self::NonceExpired => "E2008",

            // Matching / chat
            Self::CannotMatchSelf => "E3001",
            Self::NotMatched => "E3002",
            Self::MessageEmpty => "E3003",
            Self::MessageTooLong => "E3004",

            // Stakes
            Self::StakeNotFound => "E4001",
            Self::NotStakeCreator => "E4002",
            Self::NotStakeParticipant => "E4003",
            Self::StakeAlreadyAccepted => "E4004",
            Self::StakeNotPending => "E4005",
            Self::StakeNotAccepted => "E4006",
            Self::MeetingNotStarted => "E4007",

            // Notification
            Self::NotificationNotFound => "E5001",

            // Upload
            Self::ImageTooLarge => "E6001",
            Self::UnsupportedImageType => "E6002",
            Self::UploadFailed => "E6003",

            // Webhook
            Self::WebhookSignatureMissing => "E7001",
            Self::WebhookSignatureInvalid => "E7002",
            Self::UnknownWebhookEvent => "E7003",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable | Self::EmailDeliveryFailed
            | Self::UploadFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::InvalidAddress | Self::InvalidEmail
            | Self::VerificationTokenInvalid | Self::VerificationTokenExpired
            | Self::NonceMissing | Self::NonceExpired | Self::CannotMatchSelf
            | Self::MessageEmpty | Self::MessageTooLong | Self::StakeAlreadyAccepted
            | Self::StakeNotPending | Self::StakeNotAccepted | Self::MeetingNotStarted
            | Self::ImageTooLarge | Self::UnsupportedImageType
            | Self::UnknownWebhookEvent => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::ProfileNotFound | Self::StakeNotFound
            | Self::NotificationNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::SignatureInvalid | Self::NonceInvalid
            | Self::WebhookSignatureMissing | Self::WebhookSignatureInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotStakeCreator | Self::NotStakeParticipant
            | Self::NotMatched => StatusCode::FORBIDDEN,
            Self::RateLimited | Self::EmailRateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Conflict | Self::ProfileAlreadyExists | Self::WalletAlreadyLinked => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code this error renders with, if it is a known domain error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::Known { code, .. } => Some(*code),
            AppError::Validation(_) => Some(ErrorCode::ValidationError),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Known { code, .. } => code.status_code(),
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(diesel::result::Error::NotFound) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                if status.is_server_error() {
                    tracing::error!(code = code.code(), "{message}");
                }
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", format!("database error: {err}")),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn known_error_envelope() {
        let value = body_json(AppError::new(ErrorCode::StakeNotFound, "stake not found")).await;

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "E4001");
        assert_eq!(value["error"]["message"], "stake not found");
        assert!(value["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn details_are_rendered() {
        let err = AppError::with_details(
            ErrorCode::ImageTooLarge,
            "too big",
            serde_json::json!({ "size": "3.50 MB" }),
        );
        let value = body_json(err).await;
        assert_eq!(value["error"]["details"]["size"], "3.50 MB");
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let err = AppError::Internal(anyhow::anyhow!("rpc node exploded"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let value = body_json(AppError::Internal(anyhow::anyhow!("rpc node exploded"))).await;
        assert_eq!(value["error"]["message"], "internal server error");
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ErrorCode::ValidationError.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::SignatureInvalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::NotStakeCreator.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::StakeNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::WalletAlreadyLinked.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::EmailRateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorCode::EmailDeliveryFailed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let err = AppError::Validation("missing field".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));
    }
}
