use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use basematch_shared::clients::chain::recover_signer;
use basematch_shared::{AppError, AppResult, ErrorCode};

use crate::models::{NewUser, NewWalletNonce, Profile, User, WalletVerification};
use crate::services::random_hex;
use crate::store::{ProfileRepository, Store, Unique, UserRepository, VerificationRepository};

pub const NONCE_TTL_MINUTES: i64 = 10;

static NONCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Nonce:\s*([0-9a-fA-F]+)").expect("nonce pattern is valid"));

pub fn extract_nonce(message: &str) -> Option<&str> {
    NONCE_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn sign_in_message(wallet: &str, nonce: &str, issued_at: DateTime<Utc>) -> String {
    format!(
        "BaseMatch wants you to verify ownership of this wallet.\n\n\
         Wallet: {wallet}\n\
         Nonce: {nonce}\n\
         Issued At: {}",
        issued_at.to_rfc3339()
    )
}

#[derive(Debug, Clone)]
pub struct IssuedNonce {
    pub token: String,
    pub nonce: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Issue a single-use nonce the wallet must sign within ten minutes.
pub async fn issue_nonce(store: &dyn Store, email: &str, wallet: &str) -> AppResult<IssuedNonce> {
    let now = Utc::now();
    let nonce = random_hex(16);
    let record = store
        .insert_wallet_nonce(NewWalletNonce {
            token: random_hex(32),
            wallet_address: wallet.to_string(),
            email: email.to_string(),
            nonce: nonce.clone(),
            expires_at: now + Duration::minutes(NONCE_TTL_MINUTES),
        })
        .await?;

    tracing::debug!(wallet = %wallet, "wallet nonce issued");

    Ok(IssuedNonce {
        message: sign_in_message(wallet, &nonce, now),
        token: record.token,
        nonce,
        expires_at: record.expires_at,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct SignatureProof<'a> {
    pub token: &'a str,
    pub email: &'a str,
    pub wallet: &'a str,
    pub message: &'a str,
    pub signature: &'a str,
}

fn wallet_taken() -> AppError {
    AppError::new(
        ErrorCode::WalletAlreadyLinked,
        "This wallet is already linked to another account",
    )
}

/// Verify a signed nonce and bind the wallet to the account behind `email`.
pub async fn verify_signature(
    store: &dyn Store,
    proof: SignatureProof<'_>,
    now: DateTime<Utc>,
) -> AppResult<User> {
    let signer = recover_signer(proof.message, proof.signature).map_err(|e| {
        tracing::debug!(error = %e, "signature recovery failed");
        AppError::new(ErrorCode::SignatureInvalid, "Invalid signature")
    })?;
    if signer != proof.wallet {
        tracing::info!(wallet = %proof.wallet, signer = %signer, "signature from wrong wallet");
        return Err(AppError::new(
            ErrorCode::SignatureInvalid,
            "Signature does not match wallet address",
        ));
    }

    let nonce = extract_nonce(proof.message).ok_or_else(|| {
        AppError::new(ErrorCode::NonceMissing, "Signed message does not contain a nonce")
    })?;

    let record = store
        .wallet_nonce(proof.token, proof.wallet, proof.email)
        .await?
        .filter(|r| r.nonce.eq_ignore_ascii_case(nonce))
        .ok_or_else(|| AppError::new(ErrorCode::NonceInvalid, "Invalid or already used nonce"))?;

    if record.expires_at < now {
        store.delete_wallet_nonce(record.id).await?;
        return Err(AppError::new(ErrorCode::NonceExpired, "Nonce has expired"));
    }

    ensure_wallet_free(store, proof.email, proof.wallet).await?;

    let user = find_or_create_user(store, proof.email).await?;
    let user = match store.bind_user_wallet(user.id, proof.wallet).await? {
        Unique::Written(user) => user,
        Unique::Conflict => return Err(wallet_taken()),
    };

    store
        .upsert_wallet_verification(WalletVerification {
            user_id: user.id,
            wallet_address: proof.wallet.to_string(),
            signature: proof.signature.to_string(),
            message: proof.message.to_string(),
            verified_at: now,
        })
        .await?;

    mark_profile_wallet_verified(store, proof.email, proof.wallet).await?;

    store.delete_wallet_nonce(record.id).await?;
    tracing::info!(user_id = %user.id, wallet = %proof.wallet, "wallet verified");

    Ok(user)
}

async fn mark_profile_wallet_verified(store: &dyn Store, email: &str, wallet: &str) -> AppResult<()> {
    let profile = match store.profile_by_email(email).await? {
        Some(profile) => Some(profile),
        None => store.profile_by_wallet(wallet).await?,
    };

    match profile {
        Some(profile) => {
            if let Unique::Conflict = store.link_profile_wallet(profile.id, wallet, true).await? {
                tracing::warn!(
                    profile_id = %profile.id,
                    wallet = %wallet,
                    "wallet already on another profile, profile left unverified"
                );
            }
        }
        None => tracing::debug!(email = %email, "no profile to mark wallet-verified"),
    }
    Ok(())
}

/// 409 when `wallet` is bound to a user other than the one behind `email`.
async fn ensure_wallet_free(store: &dyn Store, email: &str, wallet: &str) -> AppResult<()> {
    match store.user_by_wallet(wallet).await? {
        Some(owner) if owner.email.as_deref() != Some(email) => Err(wallet_taken()),
        _ => Ok(()),
    }
}

async fn find_or_create_user(store: &dyn Store, email: &str) -> AppResult<User> {
    if let Some(user) = store.user_by_email(email).await? {
        return Ok(user);
    }

    match store
        .insert_user(NewUser {
            email: Some(email.to_string()),
            wallet_address: None,
        })
        .await?
    {
        Unique::Written(user) => {
            tracing::info!(user_id = %user.id, "user created");
            Ok(user)
        }
        Unique::Conflict => store
            .user_by_email(email)
            .await?
            .ok_or_else(|| AppError::internal("user vanished during creation")),
    }
}

/// Bind `wallet` to the user account behind `email`, creating it if needed.
pub async fn connect_wallet(store: &dyn Store, email: &str, wallet: &str) -> AppResult<User> {
    ensure_wallet_free(store, email, wallet).await?;

    let user = find_or_create_user(store, email).await?;
    match store.bind_user_wallet(user.id, wallet).await? {
        Unique::Written(user) => {
            tracing::info!(user_id = %user.id, wallet = %wallet, "wallet connected");
            Ok(user)
        }
        Unique::Conflict => Err(wallet_taken()),
    }
}

/// Attach `wallet` to the profile registered under `email`.
pub async fn link_profile_wallet(store: &dyn Store, email: &str, wallet: &str) -> AppResult<Profile> {
    let profile = store
        .profile_by_email(email)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "Profile not found"))?;

    if let Some(owner) = store.profile_by_wallet(wallet).await? {
        if owner.id != profile.id {
            return Err(wallet_taken());
        }
    }

    match store.link_profile_wallet(profile.id, wallet, false).await? {
        Unique::Written(profile) => {
            tracing::info!(profile_id = %profile.id, wallet = %wallet, "wallet linked to profile");
            Ok(profile)
        }
        Unique::Conflict => Err(wallet_taken()),
    }
}
