use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use basematch_shared::clients::db::{DbConn, DbPool};
use basematch_shared::{AppError, AppResult};

use super::{
    ChatRepository, InterestRepository, NotificationRepository, ProfileRepository,
    StakeRepository, Store, Unique, UserRepository, VerificationRepository,
};
use crate::models::{
    ChatMessage, EmailVerification, NewChatMessage, NewEmailVerification, NewInterest,
    NewNotification, NewProfile, NewStake, NewUser, NewWalletNonce, Notification, Profile,
    ProfileChanges, Stake, StakeChanges, StakeStatus, User, WalletNonce, WalletVerification,
};
use crate::schema::{
    chat_messages, email_verifications, interests, notifications, profiles, stakes, users,
    wallet_nonces, wallet_verifications,
};

/// Diesel-backed store over the shared r2d2 pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> AppResult<DbConn> {
        self.pool.get().map_err(|e| AppError::internal(e.to_string()))
    }
}

fn unique<T>(result: QueryResult<T>) -> AppResult<Unique<T>> {
    match result {
        Ok(row) => Ok(Unique::Written(row)),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
            tracing::debug!(
                constraint = info.constraint_name().unwrap_or("unknown"),
                "unique constraint rejected write"
            );
            Ok(Unique::Conflict)
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ProfileRepository for PgStore {
    async fn profile_by_address(&self, address: &str) -> AppResult<Option<Profile>> {
        let mut conn = self.conn()?;
        Ok(profiles::table
            .filter(profiles::address.eq(address))
            .first::<Profile>(&mut conn)
            .optional()?)
    }

    async fn profile_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        let mut conn = self.conn()?;
        Ok(profiles::table
            .filter(profiles::email.eq(email))
            .order(profiles::created_at.asc())
            .first::<Profile>(&mut conn)
            .optional()?)
    }

    async fn profile_by_wallet(&self, wallet: &str) -> AppResult<Option<Profile>> {
        let mut conn = self.conn()?;
        Ok(profiles::table
            .filter(
                profiles::address
                    .eq(wallet)
                    .or(profiles::wallet_address.eq(wallet)),
            )
            .first::<Profile>(&mut conn)
            .optional()?)
    }

    async fn insert_profile(&self, profile: NewProfile) -> AppResult<Unique<Profile>> {
        let mut conn = self.conn()?;
        unique(
            diesel::insert_into(profiles::table)
                .values(&profile)
                .get_result::<Profile>(&mut conn),
        )
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Profile> {
        let mut conn = self.conn()?;
        Ok(diesel::update(profiles::table.find(id))
            .set((&changes, profiles::updated_at.eq(Utc::now())))
            .get_result::<Profile>(&mut conn)?)
    }

    async fn mark_email_verified(&self, id: Uuid, email: &str) -> AppResult<Profile> {
        let mut conn = self.conn()?;
        Ok(diesel::update(profiles::table.find(id))
            .set((
                profiles::email.eq(email),
                profiles::email_verified.eq(true),
                profiles::updated_at.eq(Utc::now()),
            ))
            .get_result::<Profile>(&mut conn)?)
    }

    async fn link_profile_wallet(
        &self,
        id: Uuid,
        wallet: &str,
        verified: bool,
    ) -> AppResult<Unique<Profile>> {
        let mut conn = self.conn()?;
        let target = profiles::table.find(id);
        let result = if verified {
            diesel::update(target)
                .set((
                    profiles::wallet_address.eq(wallet),
                    profiles::wallet_verified.eq(true),
                    profiles::updated_at.eq(Utc::now()),
                ))
                .get_result::<Profile>(&mut conn)
        } else {
            diesel::update(target)
                .set((
                    profiles::wallet_address.eq(wallet),
                    profiles::updated_at.eq(Utc::now()),
                ))
                .get_result::<Profile>(&mut conn)
        };
        unique(result)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::email.eq(email))
            .first::<User>(&mut conn)
            .optional()?)
    }

    async fn user_by_wallet(&self, wallet: &str) -> AppResult<Option<User>> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::wallet_address.eq(wallet))
            .first::<User>(&mut conn)
            .optional()?)
    }

    async fn insert_user(&self, user: NewUser) -> AppResult<Unique<User>> {
        let mut conn = self.conn()?;
        unique(
            diesel::insert_into(users::table)
                .values(&user)
                .get_result::<User>(&mut conn),
        )
    }

    async fn bind_user_wallet(&self, id: Uuid, wallet: &str) -> AppResult<Unique<User>> {
        let mut conn = self.conn()?;
        unique(
            diesel::update(users::table.find(id))
                .set(users::wallet_address.eq(wallet))
                .get_result::<User>(&mut conn),
        )
    }

    async fn upsert_wallet_verification(&self, verification: WalletVerification) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(wallet_verifications::table)
            .values(&verification)
            .on_conflict(wallet_verifications::user_id)
            .do_update()
            .set(&verification)
            .execute(&mut conn)?;
        Ok(())
    }
}

#[async_trait]
impl VerificationRepository for PgStore {
    async fn insert_email_verification(
        &self,
        record: NewEmailVerification,
    ) -> AppResult<EmailVerification> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(email_verifications::table)
            .values(&record)
            .get_result::<EmailVerification>(&mut conn)?)
    }

    async fn email_verification(
        &self,
        email: &str,
        token: &str,
    ) -> AppResult<Option<EmailVerification>> {
        let mut conn = self.conn()?;
        Ok(email_verifications::table
            .filter(email_verifications::email.eq(email))
            .filter(email_verifications::token.eq(token))
            .order(email_verifications::created_at.desc())
            .first::<EmailVerification>(&mut conn)
            .optional()?)
    }

    async fn delete_email_verification(&self, id: Uuid) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::delete(email_verifications::table.find(id)).execute(&mut conn)?;
        Ok(())
    }

    async fn insert_wallet_nonce(&self, record: NewWalletNonce) -> AppResult<WalletNonce> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(wallet_nonces::table)
            .values(&record)
            .get_result::<WalletNonce>(&mut conn)?)
    }

    async fn wallet_nonce(
        &self,
        token: &str,
        wallet: &str,
        email: &str,
    ) -> AppResult<Option<WalletNonce>> {
        let mut conn = self.conn()?;
        Ok(wallet_nonces::table
            .filter(wallet_nonces::token.eq(token))
            .filter(wallet_nonces::wallet_address.eq(wallet))
            .filter(wallet_nonces::email.eq(email))
            .first::<WalletNonce>(&mut conn)
            .optional()?)
    }

    async fn delete_wallet_nonce(&self, id: Uuid) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::delete(wallet_nonces::table.find(id)).execute(&mut conn)?;
        Ok(())
    }
}

#[async_trait]
impl InterestRepository for PgStore {
    async fn insert_interest(&self, from: &str, to: &str) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let inserted = diesel::insert_into(interests::table)
            .values(&NewInterest { from_address: from, to_address: to })
            .on_conflict((interests::from_address, interests::to_address))
            .do_nothing()
            .execute(&mut conn)?;
        Ok(inserted == 1)
    }

    async fn interest_exists(&self, from: &str, to: &str) -> AppResult<bool> {
        let mut conn = self.conn()?;
        Ok(diesel::select(diesel::dsl::exists(
            interests::table
                .filter(interests::from_address.eq(from))
                .filter(interests::to_address.eq(to)),
        ))
        .get_result::<bool>(&mut conn)?)
    }

    async fn delete_interests_between(&self, a: &str, b: &str) -> AppResult<usize> {
        let mut conn = self.conn()?;
        Ok(diesel::delete(
            interests::table.filter(
                interests::from_address
                    .eq(a)
                    .and(interests::to_address.eq(b))
                    .or(interests::from_address.eq(b).and(interests::to_address.eq(a))),
            ),
        )
        .execute(&mut conn)?)
    }

    async fn mutual_matches(&self, address: &str) -> AppResult<Vec<String>> {
        let mut conn = self.conn()?;
        let outgoing: Vec<String> = interests::table
            .filter(interests::from_address.eq(address))
            .order(interests::created_at.desc())
            .select(interests::to_address)
            .load(&mut conn)?;
        let incoming: HashSet<String> = interests::table
            .filter(interests::to_address.eq(address))
            .select(interests::from_address)
            .load::<String>(&mut conn)?
            .into_iter()
            .collect();

        Ok(outgoing
            .into_iter()
            .filter(|peer| incoming.contains(peer))
            .collect())
    }
}

#[async_trait]
impl StakeRepository for PgStore {
    async fn insert_stake(&self, stake: NewStake) -> AppResult<Unique<Stake>> {
        let mut conn = self.conn()?;
        unique(
            diesel::insert_into(stakes::table)
                .values(&stake)
                .get_result::<Stake>(&mut conn),
        )
    }

    async fn stake(&self, id: i64) -> AppResult<Option<Stake>> {
        let mut conn = self.conn()?;
        Ok(stakes::table.find(id).first::<Stake>(&mut conn).optional()?)
    }

    async fn stakes_for(&self, address: &str) -> AppResult<Vec<Stake>> {
        let mut conn = self.conn()?;
        Ok(stakes::table
            .filter(
                stakes::user1_address
                    .eq(address)
                    .or(stakes::user2_address.eq(address)),
            )
            .order(stakes::created_at.desc())
            .load::<Stake>(&mut conn)?)
    }

    async fn update_stake(&self, id: i64, changes: StakeChanges) -> AppResult<Stake> {
        let mut conn = self.conn()?;
        Ok(diesel::update(stakes::table.find(id))
            .set((&changes, stakes::updated_at.eq(Utc::now())))
            .get_result::<Stake>(&mut conn)?)
    }

    async fn stakes_due_for_reminder(&self, now: i64, until: i64) -> AppResult<Vec<Stake>> {
        let mut conn = self.conn()?;
        Ok(stakes::table
            .filter(stakes::status.eq_any(vec![
                StakeStatus::Pending.as_str(),
                StakeStatus::Accepted.as_str(),
            ]))
            .filter(stakes::processed.eq(false))
            .filter(stakes::reminder_sent.eq(false))
            .filter(stakes::meeting_time.between(now, until))
            .load::<Stake>(&mut conn)?)
    }

    async fn expire_stale_stakes(&self, now: i64) -> AppResult<Vec<i64>> {
        let mut conn = self.conn()?;
        Ok(diesel::update(
            stakes::table
                .filter(stakes::status.eq(StakeStatus::Pending.as_str()))
                .filter(stakes::processed.eq(false))
                .filter(stakes::user2_staked.eq(false))
                .filter(stakes::meeting_time.lt(now)),
        )
        .set((
            stakes::status.eq(StakeStatus::Expired.as_str()),
            stakes::processed.eq(true),
            stakes::updated_at.eq(Utc::now()),
        ))
        .returning(stakes::id)
        .get_results::<i64>(&mut conn)?)
    }
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> AppResult<Notification> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(notifications::table)
            .values(&notification)
            .get_result::<Notification>(&mut conn)?)
    }

    async fn notifications_for(
        &self,
        address: &str,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Notification>, u64)> {
        let mut conn = self.conn()?;

        let mut query = notifications::table
            .filter(notifications::user_address.eq(address))
            .into_boxed();
        let mut count_query = notifications::table
            .filter(notifications::user_address.eq(address))
            .into_boxed();
        if unread_only {
            query = query.filter(notifications::read.eq(false));
            count_query = count_query.filter(notifications::read.eq(false));
        }

        let total: i64 = count_query.count().get_result(&mut conn)?;
        let rows = query
            .order(notifications::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load::<Notification>(&mut conn)?;

        Ok((rows, total as u64))
    }

    async fn unread_count(&self, address: &str) -> AppResult<u64> {
        let mut conn = self.conn()?;
        let count: i64 = notifications::table
            .filter(notifications::user_address.eq(address))
            .filter(notifications::read.eq(false))
            .count()
            .get_result(&mut conn)?;
        Ok(count as u64)
    }

    async fn mark_read(&self, address: &str, ids: Option<&[Uuid]>) -> AppResult<usize> {
        let mut conn = self.conn()?;
        let target = notifications::table
            .filter(notifications::user_address.eq(address))
            .filter(notifications::read.eq(false));

        let updated = match ids {
            Some(ids) => diesel::update(target.filter(notifications::id.eq_any(ids.to_vec())))
                .set(notifications::read.eq(true))
                .execute(&mut conn)?,
            None => diesel::update(target)
                .set(notifications::read.eq(true))
                .execute(&mut conn)?,
        };
        Ok(updated)
    }

    async fn delete_read(&self, address: &str) -> AppResult<usize> {
        let mut conn = self.conn()?;
        Ok(diesel::delete(
            notifications::table
                .filter(notifications::user_address.eq(address))
                .filter(notifications::read.eq(true)),
        )
        .execute(&mut conn)?)
    }
}

#[async_trait]
impl ChatRepository for PgStore {
    async fn insert_message(&self, message: NewChatMessage) -> AppResult<ChatMessage> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(chat_messages::table)
            .values(&message)
            .get_result::<ChatMessage>(&mut conn)?)
    }

    async fn conversation(&self, a: &str, b: &str, limit: i64) -> AppResult<Vec<ChatMessage>> {
        let mut conn = self.conn()?;
        Ok(chat_messages::table
            .filter(
                chat_messages::sender_address
                    .eq(a)
                    .and(chat_messages::recipient_address.eq(b))
                    .or(chat_messages::sender_address
                        .eq(b)
                        .and(chat_messages::recipient_address.eq(a))),
            )
            .order(chat_messages::created_at.asc())
            .limit(limit)
            .load::<ChatMessage>(&mut conn)?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}
