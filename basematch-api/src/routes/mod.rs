pub mod chat;
pub mod gifts;
pub mod health;
pub mod matches;
pub mod notifications;
pub mod profile;
pub mod reputation;
pub mod stakes;
pub mod upload;
pub mod verification;
pub mod wallet;
pub mod webhook;

use validator::Validate;

use basematch_shared::{normalize_address, normalize_email, AppError, AppResult, ErrorCode};

pub(crate) fn validate<T: Validate>(req: &T) -> AppResult<()> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))
}

/// Blank strings count as absent.
pub(crate) fn optional_address(raw: Option<&str>) -> AppResult<Option<String>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => normalize_address(raw).map(Some),
        None => Ok(None),
    }
}

/// Blank strings count as absent.
pub(crate) fn optional_email(raw: Option<&str>) -> AppResult<Option<String>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => normalize_email(raw).map(Some),
        None => Ok(None),
    }
}
