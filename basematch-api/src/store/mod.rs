//! Repository ports. Services only see these traits; `PgStore` backs them
//! with diesel in production and `MemoryStore` backs them in tests.

use async_trait::async_trait;
use uuid::Uuid;

use basematch_shared::AppResult;

use crate::models::{
    ChatMessage, EmailVerification, NewChatMessage, NewEmailVerification, NewNotification,
    NewProfile, NewStake, NewUser, NewWalletNonce, Notification, Profile, ProfileChanges, Stake,
    StakeChanges, User, WalletNonce, WalletVerification,
};

#[cfg(test)]
pub mod memory;
pub mod pg;

pub use pg::PgStore;

/// Result of a write guarded by a unique constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Unique<T> {
    Written(T),
    /// The constraint rejected the write; nothing changed.
    Conflict,
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn profile_by_address(&self, address: &str) -> AppResult<Option<Profile>>;
    async fn profile_by_email(&self, email: &str) -> AppResult<Option<Profile>>;
    /// Profile whose `address` or linked `wallet_address` equals `wallet`.
    async fn profile_by_wallet(&self, wallet: &str) -> AppResult<Option<Profile>>;
    async fn insert_profile(&self, profile: NewProfile) -> AppResult<Unique<Profile>>;
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Profile>;
    async fn mark_email_verified(&self, id: Uuid, email: &str) -> AppResult<Profile>;
    /// Sets `wallet_address` (and optionally `wallet_verified`).
    async fn link_profile_wallet(
        &self,
        id: Uuid,
        wallet: &str,
        verified: bool,
    ) -> AppResult<Unique<Profile>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn user_by_wallet(&self, wallet: &str) -> AppResult<Option<User>>;
    async fn insert_user(&self, user: NewUser) -> AppResult<Unique<User>>;
    async fn bind_user_wallet(&self, id: Uuid, wallet: &str) -> AppResult<Unique<User>>;
    async fn upsert_wallet_verification(&self, verification: WalletVerification) -> AppResult<()>;
}

#[async_trait]
pub trait VerificationRepository: Send + Sync {
    async fn insert_email_verification(
        &self,
        record: NewEmailVerification,
    ) -> AppResult<EmailVerification>;
    async fn email_verification(
        &self,
        email: &str,
        token: &str,
    ) -> AppResult<Option<EmailVerification>>;
    async fn delete_email_verification(&self, id: Uuid) -> AppResult<()>;

    async fn insert_wallet_nonce(&self, record: NewWalletNonce) -> AppResult<WalletNonce>;
    async fn wallet_nonce(
        &self,
        token: &str,
        wallet: &str,
        email: &str,
    ) -> AppResult<Option<WalletNonce>>;
    async fn delete_wallet_nonce(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait InterestRepository: Send + Sync {
    /// Returns `false` when the edge already existed.
    async fn insert_interest(&self, from: &str, to: &str) -> AppResult<bool>;
    async fn interest_exists(&self, from: &str, to: &str) -> AppResult<bool>;
    /// Removes both directed edges between `a` and `b`.
    async fn delete_interests_between(&self, a: &str, b: &str) -> AppResult<usize>;
    async fn mutual_matches(&self, address: &str) -> AppResult<Vec<String>>;
}

#[async_trait]
pub trait StakeRepository: Send + Sync {
    async fn insert_stake(&self, stake: NewStake) -> AppResult<Unique<Stake>>;
    async fn stake(&self, id: i64) -> AppResult<Option<Stake>>;
    async fn stakes_for(&self, address: &str) -> AppResult<Vec<Stake>>;
    async fn update_stake(&self, id: i64, changes: StakeChanges) -> AppResult<Stake>;
    /// Open, unprocessed stakes with `now <= meeting_time <= until` and no
    /// reminder sent yet.
    async fn stakes_due_for_reminder(&self, now: i64, until: i64) -> AppResult<Vec<Stake>>;
    /// Marks pending, unprocessed stakes whose meeting passed without the
    /// invitee staking as expired. Returns the affected ids.
    async fn expire_stale_stakes(&self, now: i64) -> AppResult<Vec<i64>>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert_notification(&self, notification: NewNotification)
        -> AppResult<Notification>;
    /// Newest first, with the total row count for pagination.
    async fn notifications_for(
        &self,
        address: &str,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Notification>, u64)>;
    async fn unread_count(&self, address: &str) -> AppResult<u64>;
    /// Marks `ids` (or every unread notification when `None`) as read.
    async fn mark_read(&self, address: &str, ids: Option<&[Uuid]>) -> AppResult<usize>;
    async fn delete_read(&self, address: &str) -> AppResult<usize>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn insert_message(&self, message: NewChatMessage) -> AppResult<ChatMessage>;
    /// Both directions, oldest first.
    async fn conversation(&self, a: &str, b: &str, limit: i64) -> AppResult<Vec<ChatMessage>>;
}

/// Everything the API persists.
#[async_trait]
pub trait Store:
    ProfileRepository
    + UserRepository
    + VerificationRepository
    + InterestRepository
    + StakeRepository
    + NotificationRepository
    + ChatRepository
{
    async fn ping(&self) -> AppResult<()>;
}
