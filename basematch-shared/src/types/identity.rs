//! Normalization of the two natural keys users are identified by:
//! EVM account addresses and email addresses.

use crate::errors::{AppError, AppResult, ErrorCode};

/// Trim, validate and lowercase an EVM address (`0x` + 40 hex digits).
pub fn normalize_address(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| invalid_address(raw))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid_address(raw));
    }

    Ok(format!("0x{}", hex_part.to_ascii_lowercase()))
}

fn invalid_address(raw: &str) -> AppError {
    AppError::new(ErrorCode::InvalidAddress, format!("invalid wallet address: {raw}"))
}

/// Trim and lowercase an email, rejecting anything that is not shaped like one.
pub fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !validator::validate_email(email.as_str()) {
        return Err(AppError::new(ErrorCode::InvalidEmail, "invalid email format"));
    }
    Ok(email)
}

/// `0x1234…abcd`, for messages where no display name is known.
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}
