//! Periodic stake maintenance: meeting reminders and expiry of stakes the
//! invitee never matched.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use basematch_shared::middleware::record_stake_transition;
use basematch_shared::AppResult;

use crate::models::{StakeChanges, StakeStatus};
use crate::services::notifications::{self, kind};
use crate::services::unix_now;
use crate::store::{StakeRepository, Store};
use crate::AppState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub reminders: usize,
    pub expired: usize,
}

/// One sweep at `now` (unix seconds). Reminders go to both parties of every
/// open stake whose meeting starts within `window_secs`.
pub async fn sweep(store: &dyn Store, now: i64, window_secs: i64) -> AppResult<SweepReport> {
    let mut report = SweepReport::default();

    for stake in store.stakes_due_for_reminder(now, now + window_secs).await? {
        let minutes = (stake.meeting_time - now).max(0) / 60;
        let message = format!("Your date starts in {minutes} minutes. Don't forget to check in!");
        for party in [&stake.user1_address, &stake.user2_address] {
            notifications::notify(
                store,
                party,
                kind::MEETING_REMINDER,
                "Meeting reminder",
                &message,
                Some(json!({
                    "stakeId": stake.id,
                    "meetingTime": stake.meeting_time,
                    "matchAddress": stake.counterparty_of(party),
                })),
            )
            .await;
        }

        let marked = store
            .update_stake(
                stake.id,
                StakeChanges {
                    reminder_sent: Some(true),
                    ..Default::default()
                },
            )
            .await;
        match marked {
            Ok(_) => report.reminders += 1,
            Err(e) => tracing::warn!(stake_id = stake.id, error = %e, "failed to mark reminder sent"),
        }
    }

    let expired = store.expire_stale_stakes(now).await?;
    for stake_id in &expired {
        record_stake_transition(StakeStatus::Expired.as_str());
        tracing::info!(stake_id, "stake expired by sweeper");
    }
    report.expired = expired.len();

    Ok(report)
}

/// Run [`sweep`] every `sweep_interval_secs` until the runtime shuts down.
pub fn spawn(state: Arc<AppState>) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.sweep_interval_secs.max(1));
    let window = state.config.reminder_window_secs as i64;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval_secs = period.as_secs(), "stake sweeper started");

        loop {
            ticker.tick().await;
            match sweep(state.store.as_ref(), unix_now(), window).await {
                Ok(report) if report != SweepReport::default() => tracing::info!(
                    reminders = report.reminders,
                    expired = report.expired,
                    "stake sweep finished"
                ),
                Ok(_) => tracing::debug!("stake sweep found nothing to do"),
                Err(e) => tracing::error!(error = %e, "stake sweep failed"),
            }
        }
    })
}
