//! Stored notifications. Reading one consumes it.

use zap_types::api::NotificationResponse;
use zap_types::id::{Prefix, new_id};
use zap_types::models::{Notification, NotificationKind, User};

use crate::error::{CoreError, CoreResult};
use crate::store::Store;

/// What the adapter hands to the push gateway after a notification is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub notification_id: String,
    pub device_token: String,
}

pub fn friend_request(sender: &User, receiver_id: &str) -> Notification {
    Notification {
        id: new_id(Prefix::Notification),
        user_id: receiver_id.to_string(),
        kind: NotificationKind::FriendRequest,
        title: "Friend Request".into(),
        content: format!("{} has sent you a friend request!", sender.handle),
        target_id: Some(sender.id.clone()),
    }
}

pub fn to_response(notification: Notification) -> NotificationResponse {
    NotificationResponse {
        kind: notification.kind,
        target_id: notification.target_id,
        title: notification.title,
        content: notification.content,
    }
}

/// Returns and deletes one notification. Someone else's reads as not found.
pub fn consume(store: &dyn Store, user: &User, id: &str) -> CoreResult<NotificationResponse> {
    let notification = store
        .notification(id)?
        .filter(|n| n.user_id == user.id)
        .ok_or_else(|| CoreError::not_found("notification", id))?;
    if store.delete_notifications(&[notification.id.clone()])? == 0 {
        // consumed concurrently
        return Err(CoreError::not_found("notification", id));
    }
    Ok(to_response(notification))
}

pub fn consume_all(store: &dyn Store, user: &User) -> CoreResult<Vec<NotificationResponse>> {
    let notifications = store.notifications_for(&user.id)?;
    if notifications.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = notifications.iter().map(|n| n.id.clone()).collect();
    store.delete_notifications(&ids)?;
    Ok(notifications.into_iter().map(to_response).collect())
}
