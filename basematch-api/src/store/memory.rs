//! In-memory store for tests. Mirrors the unique constraints of the
//! Postgres schema so conflict paths can be exercised without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use basematch_shared::{AppError, AppResult};

use super::{
    ChatRepository, InterestRepository, NotificationRepository, ProfileRepository,
    StakeRepository, Store, Unique, UserRepository, VerificationRepository,
};
use crate::models::{
    ChatMessage, EmailVerification, Interest, NewChatMessage, NewEmailVerification,
    NewNotification, NewProfile, NewStake, NewUser, NewWalletNonce, Notification, Profile,
    ProfileChanges, Stake, StakeChanges, StakeStatus, User, WalletNonce, WalletVerification,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    profiles: Vec<Profile>,
    email_verifications: Vec<EmailVerification>,
    wallet_nonces: Vec<WalletNonce>,
    wallet_verifications: Vec<WalletVerification>,
    interests: Vec<Interest>,
    stakes: Vec<Stake>,
    notifications: Vec<Notification>,
    chat_messages: Vec<ChatMessage>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_notifications: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every notification insert fail, to exercise best-effort paths.
    pub fn fail_notifications(&self) {
        *self.fail_notifications.lock().unwrap() = true;
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.tables.lock().unwrap().notifications.clone()
    }

    pub fn notifications_of_type(&self, address: &str, kind: &str) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| n.user_address == address && n.notification_type == kind)
            .collect()
    }

    pub fn interest_count(&self) -> usize {
        self.tables.lock().unwrap().interests.len()
    }

    pub fn email_verification_count(&self) -> usize {
        self.tables.lock().unwrap().email_verifications.len()
    }

    pub fn wallet_nonce_count(&self) -> usize {
        self.tables.lock().unwrap().wallet_nonces.len()
    }

    pub fn wallet_verifications(&self) -> Vec<WalletVerification> {
        self.tables.lock().unwrap().wallet_verifications.clone()
    }

    pub fn set_meeting_time(&self, id: i64, meeting_time: i64) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(stake) = tables.stakes.iter_mut().find(|s| s.id == id) {
            stake.meeting_time = meeting_time;
        }
    }

    pub fn set_verification_expiry(&self, email: &str, expires_at: chrono::DateTime<Utc>) {
        let mut tables = self.tables.lock().unwrap();
        for record in tables.email_verifications.iter_mut().filter(|r| r.email == email) {
            record.expires_at = expires_at;
        }
    }

    pub fn set_nonce_expiry(&self, wallet: &str, expires_at: chrono::DateTime<Utc>) {
        let mut tables = self.tables.lock().unwrap();
        for record in tables.wallet_nonces.iter_mut().filter(|r| r.wallet_address == wallet) {
            record.expires_at = expires_at;
        }
    }
}

fn not_found() -> AppError {
    AppError::Database(diesel::result::Error::NotFound)
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn profile_by_address(&self, address: &str) -> AppResult<Option<Profile>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter()
            .find(|p| p.address.as_deref() == Some(address))
            .cloned())
    }

    async fn profile_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter()
            .find(|p| p.email.as_deref() == Some(email))
            .cloned())
    }

    async fn profile_by_wallet(&self, wallet: &str) -> AppResult<Option<Profile>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter()
            .find(|p| {
                p.address.as_deref() == Some(wallet) || p.wallet_address.as_deref() == Some(wallet)
            })
            .cloned())
    }

    async fn insert_profile(&self, profile: NewProfile) -> AppResult<Unique<Profile>> {
        let mut tables = self.tables.lock().unwrap();
        let taken = profile.address.is_some()
            && tables.profiles.iter().any(|p| p.address == profile.address);
        if taken {
            return Ok(Unique::Conflict);
        }

        let now = Utc::now();
        let row = Profile {
            id: Uuid::new_v4(),
            address: profile.address,
            email: profile.email,
            name: profile.name,
            birth_year: profile.birth_year,
            gender: profile.gender,
            interests: profile.interests,
            photo_url: profile.photo_url,
            email_verified: profile.email_verified,
            wallet_verified: profile.wallet_verified,
            wallet_address: profile.wallet_address,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.push(row.clone());
        Ok(Unique::Written(row))
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Profile> {
        let mut tables = self.tables.lock().unwrap();
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(not_found)?;

        if let Some(name) = changes.name {
            profile.name = name;
        }
        if changes.birth_year.is_some() {
            profile.birth_year = changes.birth_year;
        }
        if changes.gender.is_some() {
            profile.gender = changes.gender;
        }
        if changes.interests.is_some() {
            profile.interests = changes.interests;
        }
        if changes.photo_url.is_some() {
            profile.photo_url = changes.photo_url;
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn mark_email_verified(&self, id: Uuid, email: &str) -> AppResult<Profile> {
        let mut tables = self.tables.lock().unwrap();
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(not_found)?;
        profile.email = Some(email.to_string());
        profile.email_verified = true;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn link_profile_wallet(
        &self,
        id: Uuid,
        wallet: &str,
        verified: bool,
    ) -> AppResult<Unique<Profile>> {
        let mut tables = self.tables.lock().unwrap();
        let taken = tables
            .profiles
            .iter()
            .any(|p| p.id != id && p.wallet_address.as_deref() == Some(wallet));
        if taken {
            return Ok(Unique::Conflict);
        }

        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(not_found)?;
        profile.wallet_address = Some(wallet.to_string());
        if verified {
            profile.wallet_verified = true;
        }
        profile.updated_at = Utc::now();
        Ok(Unique::Written(profile.clone()))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn user_by_wallet(&self, wallet: &str) -> AppResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|u| u.wallet_address.as_deref() == Some(wallet))
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> AppResult<Unique<User>> {
        let mut tables = self.tables.lock().unwrap();
        let taken = tables.users.iter().any(|u| {
            (user.email.is_some() && u.email == user.email)
                || (user.wallet_address.is_some() && u.wallet_address == user.wallet_address)
        });
        if taken {
            return Ok(Unique::Conflict);
        }

        let row = User {
            id: Uuid::new_v4(),
            email: user.email,
            wallet_address: user.wallet_address,
            created_at: Utc::now(),
        };
        tables.users.push(row.clone());
        Ok(Unique::Written(row))
    }

    async fn bind_user_wallet(&self, id: Uuid, wallet: &str) -> AppResult<Unique<User>> {
        let mut tables = self.tables.lock().unwrap();
        let taken = tables
            .users
            .iter()
            .any(|u| u.id != id && u.wallet_address.as_deref() == Some(wallet));
        if taken {
            return Ok(Unique::Conflict);
        }

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(not_found)?;
        user.wallet_address = Some(wallet.to_string());
        Ok(Unique::Written(user.clone()))
    }

    async fn upsert_wallet_verification(&self, verification: WalletVerification) -> AppResult<()> {
        let mut tables = self.tables.lock().unwrap();
        tables
            .wallet_verifications
            .retain(|v| v.user_id != verification.user_id);
        tables.wallet_verifications.push(verification);
        Ok(())
    }
}

#[async_trait]
impl VerificationRepository for MemoryStore {
    async fn insert_email_verification(
        &self,
        record: NewEmailVerification,
    ) -> AppResult<EmailVerification> {
        let mut tables = self.tables.lock().unwrap();
        let row = EmailVerification {
            id: Uuid::new_v4(),
            email: record.email,
            wallet_address: record.wallet_address,
            token: record.token,
            expires_at: record.expires_at,
            created_at: Utc::now(),
        };
        tables.email_verifications.push(row.clone());
        Ok(row)
    }

    async fn email_verification(
        &self,
        email: &str,
        token: &str,
    ) -> AppResult<Option<EmailVerification>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .email_verifications
            .iter()
            .rev()
            .find(|r| r.email == email && r.token == token)
            .cloned())
    }

    async fn delete_email_verification(&self, id: Uuid) -> AppResult<()> {
        self.tables
            .lock()
            .unwrap()
            .email_verifications
            .retain(|r| r.id != id);
        Ok(())
    }

    async fn insert_wallet_nonce(&self, record: NewWalletNonce) -> AppResult<WalletNonce> {
        let mut tables = self.tables.lock().unwrap();
        let row = WalletNonce {
            id: Uuid::new_v4(),
            token: record.token,
            wallet_address: record.wallet_address,
            email: record.email,
            nonce: record.nonce,
            expires_at: record.expires_at,
            created_at: Utc::now(),
        };
        tables.wallet_nonces.push(row.clone());
        Ok(row)
    }

    async fn wallet_nonce(
        &self,
        token: &str,
        wallet: &str,
        email: &str,
    ) -> AppResult<Option<WalletNonce>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .wallet_nonces
            .iter()
            .find(|n| n.token == token && n.wallet_address == wallet && n.email == email)
            .cloned())
    }

    async fn delete_wallet_nonce(&self, id: Uuid) -> AppResult<()> {
        self.tables.lock().unwrap().wallet_nonces.retain(|n| n.id != id);
        Ok(())
    }
}

#[async_trait]
impl InterestRepository for MemoryStore {
    async fn insert_interest(&self, from: &str, to: &str) -> AppResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .interests
            .iter()
            .any(|i| i.from_address == from && i.to_address == to)
        {
            return Ok(false);
        }
        tables.interests.push(Interest {
            id: Uuid::new_v4(),
            from_address: from.to_string(),
            to_address: to.to_string(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn interest_exists(&self, from: &str, to: &str) -> AppResult<bool> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .interests
            .iter()
            .any(|i| i.from_address == from && i.to_address == to))
    }

    async fn delete_interests_between(&self, a: &str, b: &str) -> AppResult<usize> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.interests.len();
        tables.interests.retain(|i| {
            !((i.from_address == a && i.to_address == b)
                || (i.from_address == b && i.to_address == a))
        });
        Ok(before - tables.interests.len())
    }

    async fn mutual_matches(&self, address: &str) -> AppResult<Vec<String>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .interests
            .iter()
            .filter(|i| i.from_address == address)
            .filter(|i| {
                tables
                    .interests
                    .iter()
                    .any(|r| r.from_address == i.to_address && r.to_address == address)
            })
            .map(|i| i.to_address.clone())
            .collect())
    }
}

#[async_trait]
impl StakeRepository for MemoryStore {
    async fn insert_stake(&self, stake: NewStake) -> AppResult<Unique<Stake>> {
        let mut tables = self.tables.lock().unwrap();
        if tables.stakes.iter().any(|s| s.id == stake.id) {
            return Ok(Unique::Conflict);
        }

        let now = Utc::now();
        let row = Stake {
            id: stake.id,
            user1_address: stake.user1_address,
            user2_address: stake.user2_address,
            user1_amount: stake.user1_amount,
            user2_amount: None,
            meeting_time: stake.meeting_time,
            user1_staked: stake.user1_staked,
            user2_staked: false,
            user1_confirmed: false,
            user2_confirmed: false,
            processed: false,
            reminder_sent: false,
            status: stake.status,
            created_at: now,
            updated_at: now,
        };
        tables.stakes.push(row.clone());
        Ok(Unique::Written(row))
    }

    async fn stake(&self, id: i64) -> AppResult<Option<Stake>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.stakes.iter().find(|s| s.id == id).cloned())
    }

    async fn stakes_for(&self, address: &str) -> AppResult<Vec<Stake>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .stakes
            .iter()
            .rev()
            .filter(|s| s.is_participant(address))
            .cloned()
            .collect())
    }

    async fn update_stake(&self, id: i64, changes: StakeChanges) -> AppResult<Stake> {
        let mut tables = self.tables.lock().unwrap();
        let stake = tables
            .stakes
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(not_found)?;

        if let Some(status) = changes.status {
            stake.status = status;
        }
        if let Some(processed) = changes.processed {
            stake.processed = processed;
        }
        if let Some(staked) = changes.user2_staked {
            stake.user2_staked = staked;
        }
        if changes.user2_amount.is_some() {
            stake.user2_amount = changes.user2_amount;
        }
        if let Some(confirmed) = changes.user1_confirmed {
            stake.user1_confirmed = confirmed;
        }
        if let Some(confirmed) = changes.user2_confirmed {
            stake.user2_confirmed = confirmed;
        }
        if let Some(sent) = changes.reminder_sent {
            stake.reminder_sent = sent;
        }
        stake.updated_at = Utc::now();
        Ok(stake.clone())
    }

    async fn stakes_due_for_reminder(&self, now: i64, until: i64) -> AppResult<Vec<Stake>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .stakes
            .iter()
            .filter(|s| {
                matches!(s.status(), Some(StakeStatus::Pending | StakeStatus::Accepted))
                    && !s.processed
                    && !s.reminder_sent
                    && (now..=until).contains(&s.meeting_time)
            })
            .cloned()
            .collect())
    }

    async fn expire_stale_stakes(&self, now: i64) -> AppResult<Vec<i64>> {
        let mut tables = self.tables.lock().unwrap();
        let mut expired = Vec::new();
        for stake in tables.stakes.iter_mut().filter(|s| {
            s.status() == Some(StakeStatus::Pending)
                && !s.processed
                && !s.user2_staked
                && s.meeting_time < now
        }) {
            stake.status = StakeStatus::Expired.as_str().to_string();
            stake.processed = true;
            stake.updated_at = Utc::now();
            expired.push(stake.id);
        }
        Ok(expired)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> AppResult<Notification> {
        if *self.fail_notifications.lock().unwrap() {
            return Err(AppError::internal("notification insert failed"));
        }

        let mut tables = self.tables.lock().unwrap();
        let row = Notification {
            id: Uuid::new_v4(),
            user_address: notification.user_address,
            notification_type: notification.notification_type,
            title: notification.title,
            message: notification.message,
            metadata: notification.metadata,
            read: false,
            created_at: Utc::now(),
        };
        tables.notifications.push(row.clone());
        Ok(row)
    }

    async fn notifications_for(
        &self,
        address: &str,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Notification>, u64)> {
        let tables = self.tables.lock().unwrap();
        let matching: Vec<&Notification> = tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_address == address && (!unread_only || !n.read))
            .collect();
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn unread_count(&self, address: &str) -> AppResult<u64> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .notifications
            .iter()
            .filter(|n| n.user_address == address && !n.read)
            .count() as u64)
    }

    async fn mark_read(&self, address: &str, ids: Option<&[Uuid]>) -> AppResult<usize> {
        let mut tables = self.tables.lock().unwrap();
        let mut updated = 0;
        for n in tables.notifications.iter_mut().filter(|n| {
            n.user_address == address && !n.read && ids.map_or(true, |ids| ids.contains(&n.id))
        }) {
            n.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_read(&self, address: &str) -> AppResult<usize> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.notifications.len();
        tables
            .notifications
            .retain(|n| !(n.user_address == address && n.read));
        Ok(before - tables.notifications.len())
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn insert_message(&self, message: NewChatMessage) -> AppResult<ChatMessage> {
        let mut tables = self.tables.lock().unwrap();
        let row = ChatMessage {
            id: Uuid::new_v4(),
            sender_address: message.sender_address,
            recipient_address: message.recipient_address,
            content: message.content,
            created_at: Utc::now(),
        };
        tables.chat_messages.push(row.clone());
        Ok(row)
    }

    async fn conversation(&self, a: &str, b: &str, limit: i64) -> AppResult<Vec<ChatMessage>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .chat_messages
            .iter()
            .filter(|m| {
                (m.sender_address == a && m.recipient_address == b)
                    || (m.sender_address == b && m.recipient_address == a)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
