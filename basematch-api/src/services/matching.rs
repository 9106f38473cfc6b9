use serde_json::json;

use basematch_shared::middleware::record_match_created;
use basematch_shared::{AppError, AppResult, ErrorCode};

use crate::services::notifications::{self, kind};
use crate::store::{InterestRepository, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterestOutcome {
    /// The directed edge was already recorded; nothing changed.
    AlreadyExpressed,
    /// New edge, no reciprocal interest yet.
    Recorded,
    /// New edge that completes a mutual match.
    Matched,
}

impl InterestOutcome {
    pub fn matched(&self) -> bool {
        matches!(self, InterestOutcome::Matched)
    }

    pub fn message(&self) -> &'static str {
        match self {
            InterestOutcome::AlreadyExpressed => "Interest already expressed",
            InterestOutcome::Recorded => "Interest recorded",
            InterestOutcome::Matched => "It's a match!",
        }
    }
}

/// Record `from`'s interest in `to`. Both addresses must already be
/// normalized.
pub async fn express_interest(store: &dyn Store, from: &str, to: &str) -> AppResult<InterestOutcome> {
    if from == to {
        return Err(AppError::new(
            ErrorCode::CannotMatchSelf,
            "cannot express interest in yourself",
        ));
    }

    if !store.insert_interest(from, to).await? {
        tracing::debug!(from = %from, to = %to, "interest already recorded");
        return Ok(InterestOutcome::AlreadyExpressed);
    }

    if !store.interest_exists(to, from).await? {
        tracing::info!(from = %from, to = %to, "interest recorded");
        return Ok(InterestOutcome::Recorded);
    }

    record_match_created();
    tracing::info!(from = %from, to = %to, "mutual match");

    notify_match(store, from, to).await;
    notify_match(store, to, from).await;

    Ok(InterestOutcome::Matched)
}

async fn notify_match(store: &dyn Store, recipient: &str, peer: &str) {
    let peer_name = notifications::display_name(store, peer).await;
    let message = format!(
        "You matched with {}! Start a conversation.",
        peer_name.as_deref().unwrap_or("someone")
    );
    let metadata = json!({
        "matchAddress": peer,
        "matchName": peer_name.as_deref().unwrap_or("Unknown User"),
    });

    notifications::notify(store, recipient, kind::MATCH, "It's a match!", &message, Some(metadata))
        .await;
}

/// Remove both directed edges between `a` and `b`.
pub async fn remove_match(store: &dyn Store, a: &str, b: &str) -> AppResult<usize> {
    let removed = store.delete_interests_between(a, b).await?;
    tracing::info!(a = %a, b = %b, removed, "interests removed");
    Ok(removed)
}

pub async fn mutual_matches(store: &dyn Store, address: &str) -> AppResult<Vec<String>> {
    store.mutual_matches(address).await
}
