use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde_json::json;

use basematch_shared::clients::redis::RateLimiter;
use basematch_shared::{AppError, AppResult, ErrorCode};

use crate::models::{EmailVerification, NewEmailVerification, NewProfile, Profile};
use crate::services::notifications::{self, kind};
use crate::services::random_hex;
use crate::store::{ProfileRepository, Store, Unique, VerificationRepository};
use crate::AppState;

pub const LINK_TTL_HOURS: i64 = 24;
pub const CODE_TTL_MINUTES: i64 = 15;
const SENDS_PER_MINUTE: u64 = 1;

pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

/// One send per email per minute. A broken limiter lets the request through.
async fn check_send_rate(limiter: &dyn RateLimiter, email: &str) -> AppResult<()> {
    let key = format!("verify:rate:{email}");
    let allowed = match limiter.check(&key, SENDS_PER_MINUTE, 60).await {
        Ok(allowed) => allowed,
        Err(e) => {
            tracing::warn!(error = %e, "rate limiter unavailable, allowing send");
            true
        }
    };

    if !allowed {
        return Err(AppError::new(
            ErrorCode::EmailRateLimited,
            "Please wait a minute before requesting another verification email",
        ));
    }
    Ok(())
}

async fn store_secret(
    state: &AppState,
    email: &str,
    wallet: Option<&str>,
    secret: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<EmailVerification> {
    let record = state
        .store
        .insert_email_verification(NewEmailVerification {
            email: email.to_string(),
            wallet_address: wallet.map(str::to_string),
            token: secret.to_string(),
            expires_at,
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, email = %email, "failed to store verification");
            e
        })?;
    Ok(record)
}

/// Email a verification link valid for 24 hours.
pub async fn send_link(state: &AppState, email: &str, wallet: Option<&str>) -> AppResult<()> {
    check_send_rate(state.limiter.as_ref(), email).await?;

    let token = random_hex(32);
    store_secret(state, email, wallet, &token, Utc::now() + Duration::hours(LINK_TTL_HOURS)).await?;

    let url = state.config.verification_url(&token, email)?;
    state
        .mailer
        .send_verification_link(email, &url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, email = %email, "failed to send verification link");
            AppError::new(ErrorCode::EmailDeliveryFailed, "Failed to send verification email")
        })?;

    tracing::info!(email = %email, "verification link sent");
    Ok(())
}

/// Email a 6-digit code valid for 15 minutes.
pub async fn send_code(state: &AppState, email: &str, wallet: Option<&str>) -> AppResult<()> {
    check_send_rate(state.limiter.as_ref(), email).await?;

    let code = generate_code();
    store_secret(state, email, wallet, &code, Utc::now() + Duration::minutes(CODE_TTL_MINUTES))
        .await?;

    state
        .mailer
        .send_verification_code(email, &code)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, email = %email, "failed to send verification code");
            AppError::new(ErrorCode::EmailDeliveryFailed, "Failed to send verification email")
        })?;

    tracing::info!(email = %email, "verification code sent");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedEmail {
    pub was_already_verified: bool,
    pub fully_verified: bool,
}

/// Consume a token or code for `email` and mark the owning profile verified.
pub async fn verify(
    store: &dyn Store,
    email: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> AppResult<VerifiedEmail> {
    let record = store.email_verification(email, secret).await?.ok_or_else(|| {
        AppError::new(
            ErrorCode::VerificationTokenInvalid,
            "Invalid or unknown verification token",
        )
    })?;

    if record.expires_at < now {
        store.delete_email_verification(record.id).await?;
        tracing::info!(email = %email, "expired verification discarded");
        return Err(AppError::new(
            ErrorCode::VerificationTokenExpired,
            "Verification token has expired",
        ));
    }

    let profile = profile_for(store, &record).await?;
    let was_already_verified = profile.email_verified && profile.email.as_deref() == Some(email);
    let profile = store.mark_email_verified(profile.id, email).await?;

    if !was_already_verified {
        if let Some(address) = profile.address.as_deref() {
            notifications::notify(
                store,
                address,
                kind::EMAIL_VERIFIED,
                "Email verified",
                "Your email address has been verified.",
                Some(json!({ "email": email })),
            )
            .await;
        }
    }

    store.delete_email_verification(record.id).await?;
    tracing::info!(email = %email, profile_id = %profile.id, was_already_verified, "email verified");

    Ok(VerifiedEmail {
        was_already_verified,
        fully_verified: profile.is_fully_verified(),
    })
}

/// Profile owning the verification: by wallet first, then by email, else a
/// fresh email-first profile.
async fn profile_for(store: &dyn Store, record: &EmailVerification) -> AppResult<Profile> {
    if let Some(wallet) = record.wallet_address.as_deref() {
        if let Some(profile) = store.profile_by_wallet(wallet).await? {
            return Ok(profile);
        }
    }
    if let Some(profile) = store.profile_by_email(&record.email).await? {
        return Ok(profile);
    }

    let created = store
        .insert_profile(NewProfile {
            address: record.wallet_address.clone(),
            email: Some(record.email.clone()),
            ..Default::default()
        })
        .await?;

    match created {
        Unique::Written(profile) => {
            tracing::info!(profile_id = %profile.id, email = %record.email, "email-first profile created");
            Ok(profile)
        }
        Unique::Conflict => store
            .profile_by_email(&record.email)
            .await?
            .ok_or_else(|| AppError::internal("profile vanished during verification")),
    }
}
