//! Off-chain mirror of the staking contract's lifecycle.
//!
//! ```text
//! pending --accept--> accepted --both confirm--> completed
//!    |
//!    +--cancel--> cancelled | expired
//!    +--sweeper (meeting passed, invitee never staked)--> expired
//! ```

use serde_json::json;

use basematch_shared::clients::chain::ChainReader;
use basematch_shared::middleware::record_stake_transition;
use basematch_shared::{short_address, AppError, AppResult, ErrorCode};

use crate::models::{NewStake, Stake, StakeChanges, StakeStatus};
use crate::services::notifications::{self, kind};
use crate::store::{StakeRepository, Store, Unique};

#[derive(Debug, Clone)]
pub struct NewStakeRequest {
    pub stake_id: i64,
    pub creator: String,
    pub invitee: String,
    pub amount: String,
    pub meeting_time: i64,
}

#[derive(Debug)]
pub enum CreateOutcome {
    Created(Stake),
    AlreadyExists,
}

async fn load(store: &dyn Store, stake_id: i64) -> AppResult<Stake> {
    store
        .stake(stake_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::StakeNotFound, "Stake not found"))
}

pub async fn get_stake(store: &dyn Store, stake_id: i64) -> AppResult<Stake> {
    load(store, stake_id).await
}

pub async fn stakes_for(store: &dyn Store, address: &str) -> AppResult<Vec<Stake>> {
    store.stakes_for(address).await
}

/// Mirror a stake the creator has just opened on-chain.
pub async fn create_stake(
    store: &dyn Store,
    chain: &dyn ChainReader,
    req: NewStakeRequest,
) -> AppResult<CreateOutcome> {
    if req.stake_id < 0 {
        return Err(AppError::bad_request("stakeId must not be negative"));
    }
    if req.creator == req.invitee {
        return Err(AppError::bad_request("cannot stake on a meeting with yourself"));
    }
    if req.amount.is_empty() || !req.amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::bad_request("stakeAmount must be a decimal wei amount"));
    }

    cross_check_chain(chain, &req).await;

    let inserted = store
        .insert_stake(NewStake {
            id: req.stake_id,
            user1_address: req.creator.clone(),
            user2_address: req.invitee.clone(),
            user1_amount: req.amount.clone(),
            meeting_time: req.meeting_time,
            user1_staked: true,
            status: StakeStatus::Pending.as_str().to_string(),
        })
        .await?;

    let stake = match inserted {
        Unique::Written(stake) => stake,
        Unique::Conflict => {
            tracing::info!(stake_id = req.stake_id, "stake already mirrored");
            return Ok(CreateOutcome::AlreadyExists);
        }
    };

    record_stake_transition(StakeStatus::Pending.as_str());
    tracing::info!(
        stake_id = stake.id,
        creator = %stake.user1_address,
        invitee = %stake.user2_address,
        "stake created"
    );

    let creator_name = notifications::display_name(store, &stake.user1_address)
        .await
        .unwrap_or_else(|| short_address(&stake.user1_address));
    notifications::notify(
        store,
        &stake.user2_address,
        kind::STAKE_INVITE,
        "New date stake",
        &format!("{creator_name} staked on a meeting with you. Match the stake to confirm."),
        Some(json!({
            "stakeId": stake.id,
            "fromAddress": stake.user1_address,
            "amount": stake.user1_amount,
            "meetingTime": stake.meeting_time,
        })),
    )
    .await;

    Ok(CreateOutcome::Created(stake))
}

/// Compare the request against the contract's record. Never fails.
async fn cross_check_chain(chain: &dyn ChainReader, req: &NewStakeRequest) {
    match chain.get_stake(req.stake_id).await {
        Ok(Some(on_chain)) if on_chain.user1 != req.creator => {
            tracing::warn!(
                stake_id = req.stake_id,
                claimed_creator = %req.creator,
                chain_creator = %on_chain.user1,
                "stake creator does not match chain"
            );
        }
        Ok(Some(_)) => tracing::debug!(stake_id = req.stake_id, "stake matches chain"),
        Ok(None) => tracing::warn!(stake_id = req.stake_id, "stake not found on chain"),
        Err(e) => tracing::warn!(stake_id = req.stake_id, error = %e, "stake chain check failed"),
    }
}

/// Status a cancellation resolves to: a meeting that already passed (or a
/// caller-declared expiry) is `expired`, anything else is `cancelled`.
pub fn cancellation_status(stake: &Stake, expired_flag: bool, now: i64) -> StakeStatus {
    if expired_flag || stake.meeting_time < now {
        StakeStatus::Expired
    } else {
        StakeStatus::Cancelled
    }
}

/// Cancel a stake nobody has matched yet. Only the creator may cancel.
pub async fn cancel_stake(
    store: &dyn Store,
    stake_id: i64,
    caller: &str,
    expired_flag: bool,
    now: i64,
) -> AppResult<Stake> {
    let stake = load(store, stake_id).await?;

    // An accepted stake is locked no matter who asks or when.
    if stake.user2_staked {
        return Err(AppError::new(
            ErrorCode::StakeAlreadyAccepted,
            "Cannot cancel a stake that has been accepted",
        ));
    }
    if stake.user1_address != caller {
        return Err(AppError::new(
            ErrorCode::NotStakeCreator,
            "Only the stake creator can cancel",
        ));
    }
    if stake.processed || stake.status() != Some(StakeStatus::Pending) {
        return Err(AppError::new(ErrorCode::StakeNotPending, "Stake is no longer pending"));
    }

    let status = cancellation_status(&stake, expired_flag, now);
    let stake = store
        .update_stake(
            stake_id,
            StakeChanges {
                status: Some(status.as_str().to_string()),
                processed: Some(true),
                ..Default::default()
            },
        )
        .await?;

    record_stake_transition(status.as_str());
    tracing::info!(stake_id, status = %status, "stake closed by creator");

    if status == StakeStatus::Cancelled {
        let creator_name = notifications::display_name(store, &stake.user1_address)
            .await
            .unwrap_or_else(|| short_address(&stake.user1_address));
        notifications::notify(
            store,
            &stake.user2_address,
            kind::STAKE_CANCELLED,
            "Stake cancelled",
            &format!("{creator_name} cancelled the date stake."),
            Some(json!({ "stakeId": stake.id, "fromAddress": stake.user1_address })),
        )
        .await;
    }

    Ok(stake)
}

/// The invitee matches the creator's stake.
pub async fn accept_stake(
    store: &dyn Store,
    stake_id: i64,
    caller: &str,
    amount: &str,
) -> AppResult<Stake> {
    let stake = load(store, stake_id).await?;

    if stake.user2_address != caller {
        return Err(AppError::new(
            ErrorCode::NotStakeParticipant,
            "Only the invited user can accept this stake",
        ));
    }
    if stake.user2_staked {
        return Err(AppError::new(
            ErrorCode::StakeAlreadyAccepted,
            "Stake has already been accepted",
        ));
    }
    if stake.processed || stake.status() != Some(StakeStatus::Pending) {
        return Err(AppError::new(ErrorCode::StakeNotPending, "Stake is no longer pending"));
    }

    let stake = store
        .update_stake(
            stake_id,
            StakeChanges {
                status: Some(StakeStatus::Accepted.as_str().to_string()),
                user2_staked: Some(true),
                user2_amount: Some(amount.to_string()),
                ..Default::default()
            },
        )
        .await?;

    record_stake_transition(StakeStatus::Accepted.as_str());
    tracing::info!(stake_id, invitee = %caller, "stake accepted");

    let invitee_name = notifications::display_name(store, caller)
        .await
        .unwrap_or_else(|| short_address(caller));
    notifications::notify(
        store,
        &stake.user1_address,
        kind::STAKE_ACCEPTED,
        "Stake accepted",
        &format!("{invitee_name} matched your stake. See you there!"),
        Some(json!({ "stakeId": stake.id, "fromAddress": caller })),
    )
    .await;

    Ok(stake)
}

/// A party confirms the meeting took place. The stake completes once both
/// parties have confirmed.
pub async fn confirm_meeting(
    store: &dyn Store,
    stake_id: i64,
    caller: &str,
    now: i64,
) -> AppResult<Stake> {
    let stake = load(store, stake_id).await?;

    if !stake.is_participant(caller) {
        return Err(AppError::new(
            ErrorCode::NotStakeParticipant,
            "Only stake participants can confirm the meeting",
        ));
    }
    if stake.status() != Some(StakeStatus::Accepted) {
        return Err(AppError::new(
            ErrorCode::StakeNotAccepted,
            "Stake must be accepted before the meeting can be confirmed",
        ));
    }
    if now < stake.meeting_time {
        return Err(AppError::new(
            ErrorCode::MeetingNotStarted,
            "The meeting has not started yet",
        ));
    }

    let is_creator = stake.user1_address == caller;
    let user1_confirmed = is_creator || stake.user1_confirmed;
    let user2_confirmed = !is_creator || stake.user2_confirmed;
    let completed = user1_confirmed && user2_confirmed;

    let mut changes = StakeChanges {
        user1_confirmed: Some(user1_confirmed),
        user2_confirmed: Some(user2_confirmed),
        ..Default::default()
    };
    if completed {
        changes.status = Some(StakeStatus::Completed.as_str().to_string());
        changes.processed = Some(true);
    }

    let stake = store.update_stake(stake_id, changes).await?;

    if completed {
        record_stake_transition(StakeStatus::Completed.as_str());
        tracing::info!(stake_id, "stake completed");
    } else {
        tracing::info!(stake_id, confirmed_by = %caller, "meeting confirmed by one party");
    }

    let counterparty = stake.counterparty_of(caller).to_string();
    let message = if completed {
        "Both of you confirmed the meeting. Your stakes are being returned."
    } else {
        "Your date confirmed the meeting. Confirm on your side to release the stakes."
    };
    notifications::notify(
        store,
        &counterparty,
        kind::MEETING_CONFIRMED,
        "Meeting confirmed",
        message,
        Some(json!({ "stakeId": stake.id, "fromAddress": caller, "completed": completed })),
    )
    .await;

    Ok(stake)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::test_support::{FakeChain, ALICE, BOB, CAROL};
    use basematch_shared::clients::chain::ChainStake;

    const NOW: i64 = 1_700_000_000;

    fn request(stake_id: i64) -> NewStakeRequest {
        NewStakeRequest {
            stake_id,
            creator: ALICE.into(),
            invitee: BOB.into(),
            amount: "1000000000000000".into(),
            meeting_time: NOW + 86_400,
        }
    }

    async fn seeded(store: &MemoryStore, stake_id: i64) -> Stake {
        match create_stake(store, &FakeChain::default(), request(stake_id)).await.unwrap() {
            CreateOutcome::Created(stake) => stake,
            CreateOutcome::AlreadyExists => panic!("stake {stake_id} already existed"),
        }
    }

    #[tokio::test]
    async fn create_is_idempotent_and_invites_once() {
        let store = MemoryStore::new();
        let stake = seeded(&store, 7).await;
        assert_eq!(stake.status(), Some(StakeStatus::Pending));
        assert!(stake.user1_staked);

        let again = create_stake(&store, &FakeChain::default(), request(7)).await.unwrap();
        assert!(matches!(again, CreateOutcome::AlreadyExists));
        assert_eq!(store.notifications_of_type(BOB, kind::STAKE_INVITE).len(), 1);
    }

    #[tokio::test]
    async fn chain_disagreement_is_not_fatal() {
        let store = MemoryStore::new();
        let chain = FakeChain::default();
        chain.stakes.lock().unwrap().insert(
            9,
            ChainStake {
                user1: CAROL.into(),
                user2: BOB.into(),
                amount: "1".into(),
                meeting_time: 0,
                user1_staked: true,
                user2_staked: false,
                processed: false,
            },
        );
        assert!(matches!(
            create_stake(&store, &chain, request(9)).await.unwrap(),
            CreateOutcome::Created(_)
        ));

        *chain.unreachable.lock().unwrap() = true;
        assert!(matches!(
            create_stake(&store, &chain, request(10)).await.unwrap(),
            CreateOutcome::Created(_)
        ));
    }

    #[tokio::test]
    async fn cancel_before_meeting_is_cancelled_and_notifies() {
        let store = MemoryStore::new();
        seeded(&store, 1).await;

        let stake = cancel_stake(&store, 1, ALICE, false, NOW).await.unwrap();
        assert_eq!(stake.status(), Some(StakeStatus::Cancelled));
        assert!(stake.processed);
        assert_eq!(store.notifications_of_type(BOB, kind::STAKE_CANCELLED).len(), 1);
    }

    #[tokio::test]
    async fn closed_stake_cannot_be_cancelled_again() {
        let store = MemoryStore::new();
        seeded(&store, 7).await;
        cancel_stake(&store, 7, ALICE, false, NOW).await.unwrap();

        for expired_flag in [false, true] {
            let err = cancel_stake(&store, 7, ALICE, expired_flag, NOW).await.unwrap_err();
            assert_eq!(err.code(), Some(ErrorCode::StakeNotPending));
        }
        let stake = get_stake(&store, 7).await.unwrap();
        assert_eq!(stake.status(), Some(StakeStatus::Cancelled));
        assert_eq!(store.notifications_of_type(BOB, kind::STAKE_CANCELLED).len(), 1);
    }

    #[tokio::test]
    async fn cancel_after_meeting_expires_without_flag() {
        let store = MemoryStore::new();
        seeded(&store, 2).await;
        store.set_meeting_time(2, NOW - 60);

        let stake = cancel_stake(&store, 2, ALICE, false, NOW).await.unwrap();
        assert_eq!(stake.status(), Some(StakeStatus::Expired));
        assert!(stake.processed);
        assert!(store.notifications_of_type(BOB, kind::STAKE_CANCELLED).is_empty());
    }

    #[tokio::test]
    async fn explicit_expiry_flag_wins() {
        let store = MemoryStore::new();
        seeded(&store, 3).await;

        let stake = cancel_stake(&store, 3, ALICE, true, NOW).await.unwrap();
        assert_eq!(stake.status(), Some(StakeStatus::Expired));
    }

    #[tokio::test]
    async fn accepted_stake_cannot_be_cancelled_by_anyone() {
        let store = MemoryStore::new();
        seeded(&store, 4).await;
        accept_stake(&store, 4, BOB, "1000000000000000").await.unwrap();
        store.set_meeting_time(4, NOW - 60);

        for caller in [ALICE, BOB, CAROL] {
            let err = cancel_stake(&store, 4, caller, false, NOW).await.unwrap_err();
            assert_eq!(err.code(), Some(ErrorCode::StakeAlreadyAccepted));
        }
        let stake = get_stake(&store, 4).await.unwrap();
        assert_eq!(stake.status(), Some(StakeStatus::Accepted));
    }

    #[tokio::test]
    async fn only_the_creator_cancels() {
        let store = MemoryStore::new();
        seeded(&store, 5).await;

        let err = cancel_stake(&store, 5, BOB, false, NOW).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotStakeCreator));

        let err = cancel_stake(&store, 404, ALICE, false, NOW).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::StakeNotFound));
    }

    #[tokio::test]
    async fn accept_requires_the_invitee_and_a_pending_stake() {
        let store = MemoryStore::new();
        seeded(&store, 6).await;

        let err = accept_stake(&store, 6, CAROL, "1").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotStakeParticipant));

        cancel_stake(&store, 6, ALICE, false, NOW).await.unwrap();
        let err = accept_stake(&store, 6, BOB, "1").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::StakeNotPending));
    }

    #[tokio::test]
    async fn both_confirmations_complete_the_stake() {
        let store = MemoryStore::new();
        seeded(&store, 8).await;
        accept_stake(&store, 8, BOB, "1000000000000000").await.unwrap();
        assert_eq!(store.notifications_of_type(ALICE, kind::STAKE_ACCEPTED).len(), 1);

        let meeting = NOW + 86_400;
        let err = confirm_meeting(&store, 8, ALICE, meeting - 1).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MeetingNotStarted));

        let err = confirm_meeting(&store, 8, CAROL, meeting).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotStakeParticipant));

        let half = confirm_meeting(&store, 8, ALICE, meeting).await.unwrap();
        assert!(half.user1_confirmed && !half.user2_confirmed);
        assert_eq!(half.status(), Some(StakeStatus::Accepted));

        let done = confirm_meeting(&store, 8, BOB, meeting + 5).await.unwrap();
        assert_eq!(done.status(), Some(StakeStatus::Completed));
        assert!(done.processed);
    }

    #[tokio::test]
    async fn confirm_requires_an_accepted_stake() {
        let store = MemoryStore::new();
        seeded(&store, 11).await;
        let err = confirm_meeting(&store, 11, ALICE, NOW + 90_000).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::StakeNotAccepted));
    }

    #[tokio::test]
    async fn malformed_requests_are_rejected() {
        let store = MemoryStore::new();
        let chain = FakeChain::default();

        let mut bad = request(12);
        bad.amount = "1.5 ETH".into();
        assert!(create_stake(&store, &chain, bad).await.is_err());

        let mut bad = request(13);
        bad.invitee = ALICE.into();
        assert!(create_stake(&store, &chain, bad).await.is_err());
    }
}
