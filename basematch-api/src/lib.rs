use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use basematch_shared::clients::chain::ChainReader;
use basematch_shared::clients::email::Mailer;
use basematch_shared::clients::redis::RateLimiter;
use basematch_shared::clients::storage::ObjectStorage;
use basematch_shared::middleware::metrics_middleware;

pub mod config;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

#[cfg(test)]
pub mod test_support;

use config::AppConfig;
use store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub storage: Arc<dyn ObjectStorage>,
    pub limiter: Arc<dyn RateLimiter>,
    pub chain: Arc<dyn ChainReader>,
    pub config: AppConfig,
    pub metrics: Option<PrometheusHandle>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::render_metrics))
        // Profile mirror
        .route("/api/profile/register", post(routes::profile::register))
        .route("/api/profile/status", post(routes::profile::verification_status))
        .route("/api/profile/update-by-email", post(routes::profile::update_by_email))
        .route("/api/profile/link-wallet", post(routes::wallet::link_profile_wallet))
        .route(
            "/api/profile/:address",
            get(routes::profile::get_profile).patch(routes::profile::update_profile),
        )
        // Email verification
        .route("/api/send-verification", post(routes::verification::send_verification))
        .route("/api/verify-email", post(routes::verification::verify_email))
        .route("/api/send-verification-code", post(routes::verification::send_verification_code))
        .route("/api/verify-email-code", post(routes::verification::verify_email_code))
        // Wallet
        .route("/api/wallet/nonce", post(routes::wallet::issue_nonce))
        .route("/api/verify-wallet-signature", post(routes::wallet::verify_wallet_signature))
        .route("/api/connect-wallet", post(routes::wallet::connect_wallet))
        // Interests
        .route("/api/match/express-interest", post(routes::matches::express_interest))
        .route("/api/match/remove", post(routes::matches::remove_match))
        .route("/api/match/:address", get(routes::matches::list_matches))
        // Stakes
        .route("/api/stakes/create", post(routes::stakes::create_stake))
        .route("/api/stakes/cancel", post(routes::stakes::cancel_stake))
        .route("/api/stakes/accept", post(routes::stakes::accept_stake))
        .route("/api/stakes/confirm", post(routes::stakes::confirm_meeting))
        .route("/api/stakes/user/:address", get(routes::stakes::list_user_stakes))
        .route("/api/stakes/:id", get(routes::stakes::get_stake))
        // Notifications
        .route(
            "/api/notifications",
            get(routes::notifications::list_notifications)
                .post(routes::notifications::create_notification)
                .patch(routes::notifications::mark_read)
                .delete(routes::notifications::delete_read),
        )
        .route("/api/notifications/unread-count", get(routes::notifications::unread_count))
        .route("/api/gifts/send", post(routes::gifts::send_gift))
        // Chat
        .route(
            "/api/chat/messages",
            get(routes::chat::list_messages).post(routes::chat::send_message),
        )
        .route("/api/reputation/:address", get(routes::reputation::get_reputation))
        .route(
            "/api/upload-image",
            post(routes::upload::upload_image)
                .layer(DefaultBodyLimit::max(routes::upload::UPLOAD_BODY_LIMIT)),
        )
        .route("/api/webhook", post(routes::webhook::receive_webhook))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
