use serde::Serialize;

use basematch_shared::clients::chain::{ChainProfile, ChainReader};
use basematch_shared::{AppError, AppResult, ErrorCode};

use crate::models::{NewProfile, Profile, ProfileChanges};
use crate::store::{ProfileRepository, Store, Unique};

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub address: Option<String>,
    pub email: Option<String>,
    pub name: String,
    pub birth_year: Option<i32>,
    pub gender: Option<String>,
    pub interests: Option<String>,
    pub photo_url: Option<String>,
}

fn already_registered() -> AppError {
    AppError::new(ErrorCode::ProfileAlreadyExists, "Profile already exists")
}

fn profile_not_found() -> AppError {
    AppError::new(ErrorCode::ProfileNotFound, "Profile not found")
}

/// Register a profile keyed by wallet address, email, or both.
pub async fn register(store: &dyn Store, reg: Registration) -> AppResult<Profile> {
    if reg.address.is_none() && reg.email.is_none() {
        return Err(AppError::bad_request("Either address or email is required"));
    }

    if let Some(address) = reg.address.as_deref() {
        if store.profile_by_wallet(address).await?.is_some() {
            return Err(already_registered());
        }
    }
    if let Some(email) = reg.email.as_deref() {
        if store.profile_by_email(email).await?.is_some() {
            return Err(already_registered());
        }
    }

    let profile = match store
        .insert_profile(NewProfile {
            address: reg.address,
            email: reg.email,
            name: reg.name,
            birth_year: reg.birth_year,
            gender: reg.gender,
            interests: reg.interests,
            photo_url: reg.photo_url,
            ..Default::default()
        })
        .await?
    {
        Unique::Written(profile) => profile,
        Unique::Conflict => return Err(already_registered()),
    };

    tracing::info!(
        profile_id = %profile.id,
        address = ?profile.address,
        "profile registered"
    );
    Ok(profile)
}

/// Where a looked-up profile came from.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProfileView {
    Mirror(Profile),
    Chain(ChainProfile),
}

impl ProfileView {
    pub fn source(&self) -> &'static str {
        match self {
            ProfileView::Mirror(_) => "mirror",
            ProfileView::Chain(_) => "chain",
        }
    }
}

/// Mirror row first, then the ProfileNFT contract.
pub async fn lookup(store: &dyn Store, chain: &dyn ChainReader, address: &str) -> AppResult<ProfileView> {
    if let Some(profile) = store.profile_by_wallet(address).await? {
        return Ok(ProfileView::Mirror(profile));
    }

    match chain.get_profile(address).await {
        Ok(Some(profile)) => Ok(ProfileView::Chain(profile)),
        Ok(None) => Err(profile_not_found()),
        Err(e) => {
            tracing::warn!(error = %e, address = %address, "on-chain profile lookup failed");
            Err(profile_not_found())
        }
    }
}

pub async fn update_by_address(
    store: &dyn Store,
    address: &str,
    changes: ProfileChanges,
) -> AppResult<Profile> {
    let profile = store
        .profile_by_wallet(address)
        .await?
        .ok_or_else(profile_not_found)?;
    apply(store, profile, changes).await
}

pub async fn update_by_email(
    store: &dyn Store,
    email: &str,
    changes: ProfileChanges,
) -> AppResult<Profile> {
    let profile = store
        .profile_by_email(email)
        .await?
        .ok_or_else(profile_not_found)?;
    apply(store, profile, changes).await
}

async fn apply(store: &dyn Store, profile: Profile, changes: ProfileChanges) -> AppResult<Profile> {
    if changes.is_empty() {
        return Ok(profile);
    }
    let updated = store.update_profile(profile.id, changes).await?;
    tracing::info!(profile_id = %updated.id, "profile updated");
    Ok(updated)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatus {
    pub exists: bool,
    pub email_verified: bool,
    pub wallet_verified: bool,
    pub fully_verified: bool,
    pub has_on_chain_profile: bool,
}

pub async fn verification_status(
    store: &dyn Store,
    chain: &dyn ChainReader,
    address: Option<&str>,
    email: Option<&str>,
) -> AppResult<VerificationStatus> {
    if address.is_none() && email.is_none() {
        return Err(AppError::bad_request("Either address or email is required"));
    }

    let mut profile = None;
    if let Some(address) = address {
        profile = store.profile_by_wallet(address).await?;
    }
    if profile.is_none() {
        if let Some(email) = email {
            profile = store.profile_by_email(email).await?;
        }
    }

    let chain_address = address
        .map(str::to_string)
        .or_else(|| profile.as_ref().and_then(|p| p.address.clone()));
    let has_on_chain_profile = match chain_address {
        Some(addr) => match chain.get_profile(&addr).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, address = %addr, "on-chain profile check failed");
                false
            }
        },
        None => false,
    };

    Ok(VerificationStatus {
        exists: profile.is_some(),
        email_verified: profile.as_ref().is_some_and(|p| p.email_verified),
        wallet_verified: profile.as_ref().is_some_and(|p| p.wallet_verified),
        fully_verified: profile.as_ref().is_some_and(Profile::is_fully_verified),
        has_on_chain_profile,
    })
}
