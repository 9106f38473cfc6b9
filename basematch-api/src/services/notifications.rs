use basematch_shared::middleware::record_notification_created;
use basematch_shared::AppResult;

use crate::models::{NewNotification, Notification};
use crate::store::{NotificationRepository, ProfileRepository, Store};

/// Notification `type` values the API emits.
pub mod kind {
    pub const MATCH: &str = "match";
    pub const STAKE_INVITE: &str = "stake_invite";
    pub const STAKE_ACCEPTED: &str = "stake_accepted";
    pub const STAKE_CANCELLED: &str = "stake_cancelled";
    pub const MEETING_CONFIRMED: &str = "meeting_confirmed";
    pub const MEETING_REMINDER: &str = "meeting_reminder";
    pub const EMAIL_VERIFIED: &str = "email_verified";
    pub const GIFT: &str = "gift";
}

/// Create a notification row for `user_address`.
pub async fn create_notification(
    store: &dyn Store,
    user_address: &str,
    notification_type: &str,
    title: &str,
    message: &str,
    metadata: Option<serde_json::Value>,
) -> AppResult<Notification> {
    let notification = store
        .insert_notification(NewNotification {
            user_address: user_address.to_string(),
            notification_type: notification_type.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            metadata,
        })
        .await?;

    record_notification_created(notification_type);
    tracing::debug!(
        notification_id = %notification.id,
        user_address = %user_address,
        notification_type = %notification_type,
        "notification created"
    );

    Ok(notification)
}

/// Like [`create_notification`], but a failure is only logged.
pub async fn notify(
    store: &dyn Store,
    user_address: &str,
    notification_type: &str,
    title: &str,
    message: &str,
    metadata: Option<serde_json::Value>,
) {
    if let Err(e) =
        create_notification(store, user_address, notification_type, title, message, metadata).await
    {
        tracing::warn!(
            error = %e,
            user_address = %user_address,
            notification_type = %notification_type,
            "failed to create notification"
        );
    }
}

/// Display name from the profile mirror. Missing profiles, blank names and
/// lookup failures all yield `None`.
pub async fn display_name(store: &dyn Store, address: &str) -> Option<String> {
    match store.profile_by_address(address).await {
        Ok(profile) => profile.and_then(|p| p.display_name().map(str::to_string)),
        Err(e) => {
            tracing::warn!(error = %e, address = %address, "display name lookup failed");
            None
        }
    }
}
