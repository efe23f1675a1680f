use serde::{Deserialize, Serialize};

use crate::models::{NotificationKind, ReactionKind, Region};

// -- JWT Claims --

/// Session claims issued by the auth service. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub handle: String,
    pub exp: usize,
}

// -- Users --

/// Public profile metadata, denormalized into feeds and friend lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub handle: String,
    pub first_name: String,
    pub last_name: String,
    pub region: Region,
    pub profile_picture_url: String,
}

#[derive(Debug, Deserialize)]
pub struct HandleQuery {
    pub handle: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: String,
    pub handle: String,
    pub first_name: String,
    pub last_name: String,
    pub region: Region,
    pub picture_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceTokenRequest {
    /// `None` unregisters the device.
    pub device_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadUrlResponse {
    pub upload_url: String,
}

// -- Friends --

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendsResponse {
    pub friends: Vec<Author>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendRequestsResponse {
    pub incoming: Vec<Author>,
    pub outgoing: Vec<Author>,
}

// -- Zaps --

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateZapRequest {
    /// Capture time in Unix milliseconds; defaults to now.
    pub timestamp: Option<i64>,
    pub repost_of: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateZapResponse {
    pub zap_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_front_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_back_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
}

// -- Reactions --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReactionImageRequest {
    pub kind: ReactionKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReactionImageResponse {
    pub image_id: String,
    pub upload_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReactionRequest {
    pub kind: ReactionKind,
    pub image_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

// -- Feed --

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedComment {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedReaction {
    pub id: String,
    pub author_id: String,
    pub kind: ReactionKind,
    pub image_url: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedZap {
    pub id: String,
    pub author_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repost_of: Option<String>,
    pub front_camera_url: String,
    pub back_camera_url: String,
    /// Creation time in Unix milliseconds, decoded from the id.
    pub timestamp: i64,
    /// Milliseconds past the regional activation plus grace. Absent when on time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub late_by: Option<i64>,
    pub comments: Vec<FeedComment>,
    pub reactions: Vec<FeedReaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendContent {
    pub user_id: String,
    pub zaps: Vec<FeedZap>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendFeed {
    pub content: Vec<FriendContent>,
    pub users: Vec<Author>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedResponse {
    pub my_zaps: Vec<FeedZap>,
    pub friend: FriendFeed,
}

// -- Notifications --

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationResponse>,
}

// -- Info --

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerInfo {
    pub endpoint: String,
    pub name: String,
    pub version: String,
    pub region: Region,
}
