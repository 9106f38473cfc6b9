use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use basematch_shared::extract::Json;
use basematch_shared::types::ApiResponse;
use basematch_shared::{normalize_email, AppError, AppResult};

use crate::routes::optional_address;
use crate::services::verification::{self, VerifiedEmail};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendVerificationRequest {
    pub email: String,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Empty {}

pub async fn send_verification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendVerificationRequest>,
) -> AppResult<Json<ApiResponse<Empty>>> {
    let email = normalize_email(&req.email)?;
    let wallet = optional_address(req.wallet_address.as_deref())?;

    verification::send_link(&state, &email, wallet.as_deref()).await?;
    Ok(Json(ApiResponse::ok_with_message(Empty {}, "Verification email sent")))
}

pub async fn send_verification_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendVerificationRequest>,
) -> AppResult<Json<ApiResponse<Empty>>> {
    let email = normalize_email(&req.email)?;
    let wallet = optional_address(req.wallet_address.as_deref())?;

    verification::send_code(&state, &email, wallet.as_deref()).await?;
    Ok(Json(ApiResponse::ok_with_message(Empty {}, "Verification code sent")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailBody {
    pub email_verified: bool,
    pub fully_verified: bool,
}

fn verified_response(result: VerifiedEmail) -> Json<ApiResponse<VerifyEmailBody>> {
    let message = if result.was_already_verified {
        "Email already verified"
    } else {
        "Email verified successfully"
    };
    Json(ApiResponse::ok_with_message(
        VerifyEmailBody {
            email_verified: true,
            fully_verified: result.fully_verified,
        },
        message,
    ))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
    pub email: String,
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyEmailRequest>,
) -> AppResult<Json<ApiResponse<VerifyEmailBody>>> {
    let email = normalize_email(&req.email)?;
    let token = req.token.trim();
    if token.is_empty() {
        return Err(AppError::bad_request("token is required"));
    }

    let result = verification::verify(state.store.as_ref(), &email, token, Utc::now()).await?;
    Ok(verified_response(result))
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

pub async fn verify_email_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyCodeRequest>,
) -> AppResult<Json<ApiResponse<VerifyEmailBody>>> {
    let email = normalize_email(&req.email)?;
    let code = req.code.trim();
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::bad_request("code must be 6 digits"));
    }

    let result = verification::verify(state.store.as_ref(), &email, code, Utc::now()).await?;
    Ok(verified_response(result))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{SentMail, TestContext};

    #[tokio::test]
    async fn code_flow_over_http() {
        let ctx = TestContext::new();

        let (status, body) = ctx
            .call(
                Method::POST,
                "/api/send-verification-code",
                Some(json!({ "email": " Alice@Example.com " })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Verification code sent");

        let code = match ctx.mailer.sent().pop() {
            Some(SentMail::Code { to, code }) => {
                assert_eq!(to, "alice@example.com");
                code
            }
            other => panic!("expected a code mail, got {other:?}"),
        };

        let (status, body) = ctx
            .call(
                Method::POST,
                "/api/verify-email-code",
                Some(json!({ "email": "alice@example.com", "code": code })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["emailVerified"], true);
        assert_eq!(body["fullyVerified"], false);
    }

    #[tokio::test]
    async fn unknown_token_is_a_bad_request() {
        let ctx = TestContext::new();
        let (status, body) = ctx
            .call(
                Method::POST,
                "/api/verify-email",
                Some(json!({ "email": "alice@example.com", "token": "abc" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "E2001");
    }

    #[tokio::test]
    async fn rapid_resend_is_throttled() {
        let ctx = TestContext::new();
        let body = json!({ "email": "alice@example.com" });

        let (status, _) = ctx.call(Method::POST, "/api/send-verification", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = ctx.call(Method::POST, "/api/send-verification", Some(body)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn mail_outage_is_a_server_error() {
        let ctx = TestContext::new();
        *ctx.mailer.fail.lock().unwrap() = true;

        let (status, body) = ctx
            .call(
                Method::POST,
                "/api/send-verification",
                Some(json!({ "email": "alice@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "E2004");
        assert_eq!(ctx.store.email_verification_count(), 1);
    }
}
