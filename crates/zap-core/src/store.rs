//! The identity & relationship store the core reads and writes through.
//!
//! Implementations must be safe to share across request threads; every
//! method is a single round-trip and none of them hold locks across calls.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use zap_types::models::{
    Comment, FriendRequest, Invite, Moment, Notification, NotificationKind, Reaction,
    ReactionImage, Region, User, Zap,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write. Carries the offending field.
    #[error("unique constraint violated on {0}")]
    Conflict(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait Store: Send + Sync {
    // -- Users --

    fn create_user(&self, user: &User) -> StoreResult<()>;
    fn user(&self, id: &str) -> StoreResult<Option<User>>;
    fn user_by_handle(&self, handle: &str) -> StoreResult<Option<User>>;
    fn users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<User>>;
    fn set_device_token(&self, user_id: &str, token: Option<&str>) -> StoreResult<()>;
    /// Returns the new version.
    fn bump_profile_picture_version(&self, user_id: &str) -> StoreResult<i64>;

    // -- Friend graph --

    /// Direct friends of `user_id`, whichever side of the edge they are on.
    fn friend_ids(&self, user_id: &str) -> StoreResult<HashSet<String>>;
    fn are_friends(&self, a: &str, b: &str) -> StoreResult<bool>;
    fn friend_request(&self, sender_id: &str, receiver_id: &str)
    -> StoreResult<Option<FriendRequest>>;
    fn friend_requests_involving(&self, user_id: &str) -> StoreResult<Vec<FriendRequest>>;
    fn create_friend_request(&self, request: &FriendRequest) -> StoreResult<()>;
    /// `false` when no such request existed.
    fn delete_friend_request(&self, sender_id: &str, receiver_id: &str) -> StoreResult<bool>;
    /// Deletes the request and records the friendship as one unit. `false`
    /// when the request was already gone, e.g. consumed by a concurrent accept.
    fn convert_friend_request(
        &self,
        sender_id: &str,
        receiver_id: &str,
        friendship_id: &str,
    ) -> StoreResult<bool>;

    // -- Moments --

    fn insert_moment(&self, moment: &Moment) -> StoreResult<()>;
    /// Among Moments whose activation for `region` is strictly before `now`,
    /// the latest by `date` (ties broken by id).
    fn latest_moment_activated_before(
        &self,
        region: Region,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Moment>>;
    fn latest_moment_date(&self) -> StoreResult<Option<DateTime<Utc>>>;

    // -- Zaps --

    fn create_zap(&self, zap: &Zap) -> StoreResult<()>;
    fn zap(&self, id: &str) -> StoreResult<Option<Zap>>;
    fn zaps_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Zap>>;
    fn mark_zap_uploaded(&self, id: &str) -> StoreResult<()>;
    /// Uploaded Zaps of the given authors in one Moment.
    fn uploaded_zaps(&self, moment_id: &str, author_ids: &[String]) -> StoreResult<Vec<Zap>>;
    fn create_comment(&self, comment: &Comment) -> StoreResult<()>;
    fn comments_for_zaps(&self, zap_ids: &[String]) -> StoreResult<Vec<Comment>>;

    // -- Reactions --

    fn create_reaction_image(&self, image: &ReactionImage) -> StoreResult<()>;
    fn reaction_image(&self, id: &str) -> StoreResult<Option<ReactionImage>>;
    fn mark_reaction_image_uploaded(&self, id: &str) -> StoreResult<()>;
    fn create_reaction(&self, reaction: &Reaction) -> StoreResult<()>;
    fn reaction(&self, id: &str) -> StoreResult<Option<Reaction>>;
    fn delete_reaction(&self, id: &str) -> StoreResult<bool>;
    /// Reactions on the given Zaps whose image has been uploaded.
    fn visible_reactions_for_zaps(&self, zap_ids: &[String]) -> StoreResult<Vec<Reaction>>;

    // -- Notifications --

    fn create_notification(&self, notification: &Notification) -> StoreResult<()>;
    fn notification(&self, id: &str) -> StoreResult<Option<Notification>>;
    fn notifications_for(&self, user_id: &str) -> StoreResult<Vec<Notification>>;
    fn delete_notifications(&self, ids: &[String]) -> StoreResult<usize>;
    fn delete_notifications_matching(
        &self,
        user_id: &str,
        kind: NotificationKind,
        target_id: &str,
    ) -> StoreResult<usize>;

    // -- Invites --

    fn create_invite(&self, id: &str, user_id: Option<&str>, code: &str) -> StoreResult<()>;
    fn server_invite(&self, with_code: bool) -> StoreResult<Option<Invite>>;
    fn user_invite(&self, user_id: &str, with_code: bool) -> StoreResult<Option<Invite>>;
    fn invite_by_code(&self, code: &str) -> StoreResult<Option<Invite>>;
}
