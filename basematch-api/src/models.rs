use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::schema::{
    chat_messages, email_verifications, interests, notifications, profiles, stakes, users,
    wallet_nonces, wallet_verifications,
};

// --- User ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: Option<String>,
    pub wallet_address: Option<String>,
}

// --- Profile (off-chain mirror) ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub address: Option<String>,
    pub email: Option<String>,
    pub name: String,
    pub birth_year: Option<i32>,
    pub gender: Option<String>,
    pub interests: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub wallet_verified: bool,
    pub wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_fully_verified(&self) -> bool {
        self.email_verified && self.wallet_verified
    }

    pub fn display_name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }
}

#[derive(Debug, Clone, Default, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub address: Option<String>,
    pub email: Option<String>,
    pub name: String,
    pub birth_year: Option<i32>,
    pub gender: Option<String>,
    pub interests: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub wallet_verified: bool,
    pub wallet_address: Option<String>,
}

/// Partial profile update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, AsChangeset, Deserialize, Validate)]
#[diesel(table_name = profiles)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 1900, max = 2100, message = "birthYear is out of range"))]
    pub birth_year: Option<i32>,
    #[validate(length(max = 50))]
    pub gender: Option<String>,
    #[validate(length(max = 1000))]
    pub interests: Option<String>,
    #[validate(url(message = "photoUrl must be a URL"))]
    pub photo_url: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.birth_year.is_none()
            && self.gender.is_none()
            && self.interests.is_none()
            && self.photo_url.is_none()
    }
}

// --- Email verification ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = email_verifications)]
pub struct EmailVerification {
    pub id: Uuid,
    pub email: String,
    pub wallet_address: Option<String>,
    #[serde(skip_serializing)]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = email_verifications)]
pub struct NewEmailVerification {
    pub email: String,
    pub wallet_address: Option<String>,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// --- Wallet nonces and verifications ---

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = wallet_nonces)]
pub struct WalletNonce {
    pub id: Uuid,
    pub token: String,
    pub wallet_address: String,
    pub email: String,
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = wallet_nonces)]
pub struct NewWalletNonce {
    pub token: String,
    pub wallet_address: String,
    pub email: String,
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize)]
#[diesel(table_name = wallet_verifications, primary_key(user_id))]
pub struct WalletVerification {
    pub user_id: Uuid,
    pub wallet_address: String,
    pub signature: String,
    pub message: String,
    pub verified_at: DateTime<Utc>,
}

// --- Interest (directed edge) ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = interests)]
pub struct Interest {
    pub id: Uuid,
    pub from_address: String,
    pub to_address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = interests)]
pub struct NewInterest<'a> {
    pub from_address: &'a str,
    pub to_address: &'a str,
}

// --- Stake ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeStatus {
    Pending,
    Accepted,
    Cancelled,
    Expired,
    Completed,
}

impl StakeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StakeStatus::Pending => "pending",
            StakeStatus::Accepted => "accepted",
            StakeStatus::Cancelled => "cancelled",
            StakeStatus::Expired => "expired",
            StakeStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for StakeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StakeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StakeStatus::Pending),
            "accepted" => Ok(StakeStatus::Accepted),
            "cancelled" => Ok(StakeStatus::Cancelled),
            "expired" => Ok(StakeStatus::Expired),
            "completed" => Ok(StakeStatus::Completed),
            _ => Err(format!("unknown stake status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = stakes)]
pub struct Stake {
    pub id: i64,
    pub user1_address: String,
    pub user2_address: String,
    pub user1_amount: String,
    pub user2_amount: Option<String>,
    /// Unix seconds.
    pub meeting_time: i64,
    pub user1_staked: bool,
    pub user2_staked: bool,
    pub user1_confirmed: bool,
    pub user2_confirmed: bool,
    pub processed: bool,
    pub reminder_sent: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stake {
    pub fn status(&self) -> Option<StakeStatus> {
        self.status.parse().ok()
    }

    pub fn is_participant(&self, address: &str) -> bool {
        self.user1_address == address || self.user2_address == address
    }

    pub fn counterparty_of(&self, address: &str) -> &str {
        if self.user1_address == address {
            &self.user2_address
        } else {
            &self.user1_address
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = stakes)]
pub struct NewStake {
    pub id: i64,
    pub user1_address: String,
    pub user2_address: String,
    pub user1_amount: String,
    pub meeting_time: i64,
    pub user1_staked: bool,
    pub status: String,
}

/// Column updates applied by lifecycle transitions.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = stakes)]
pub struct StakeChanges {
    pub status: Option<String>,
    pub processed: Option<bool>,
    pub user2_staked: Option<bool>,
    pub user2_amount: Option<String>,
    pub user1_confirmed: Option<bool>,
    pub user2_confirmed: Option<bool>,
    pub reminder_sent: Option<bool>,
}

// --- Notification ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub user_address: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub user_address: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
}

// --- Chat ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = chat_messages)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_address: String,
    pub recipient_address: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessage {
    pub sender_address: String,
    pub recipient_address: String,
    pub content: String,
}
