use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Geographic region. Each region activates the daily Moment at its own
/// wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Eu,
    Us,
    Wa,
    Ea,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Eu, Region::Us, Region::Wa, Region::Ea];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eu => "EU",
            Self::Us => "US",
            Self::Wa => "WA",
            Self::Ea => "EA",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError {
                kind: "region",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub handle: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub region: Region,
    /// Bumped on every profile picture upload so clients drop cached URLs.
    pub profile_picture_version: i64,
    pub device_token: Option<String>,
}

/// One activation instant per region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalTimestamps {
    #[serde(rename = "EU", with = "chrono::serde::ts_milliseconds")]
    pub eu: DateTime<Utc>,
    #[serde(rename = "US", with = "chrono::serde::ts_milliseconds")]
    pub us: DateTime<Utc>,
    #[serde(rename = "WA", with = "chrono::serde::ts_milliseconds")]
    pub wa: DateTime<Utc>,
    #[serde(rename = "EA", with = "chrono::serde::ts_milliseconds")]
    pub ea: DateTime<Utc>,
}

impl RegionalTimestamps {
    pub fn get(&self, region: Region) -> DateTime<Utc> {
        match region {
            Region::Eu => self.eu,
            Region::Us => self.us,
            Region::Wa => self.wa,
            Region::Ea => self.ea,
        }
    }

    /// Same instant for every region.
    pub fn uniform(at: DateTime<Utc>) -> Self {
        Self {
            eu: at,
            us: at,
            wa: at,
            ea: at,
        }
    }
}

/// A daily prompt. Moments are ordered by `date`; which one is current depends
/// on the region asking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moment {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    #[serde(rename = "time")]
    pub activations: RegionalTimestamps,
}

impl Moment {
    pub fn activation(&self, region: Region) -> DateTime<Utc> {
        self.activations.get(region)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zap {
    pub id: String,
    pub moment_id: String,
    pub author_id: String,
    pub uploaded: bool,
    /// Set on reposts; always points at an original, never at another repost.
    pub repost_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZapSide {
    Front,
    Back,
}

impl ZapSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub zap_id: String,
    pub author_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReactionKind {
    ThumbsUp,
    Happy,
    Surprised,
    Laughing,
    HeartEyes,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 5] = [
        ReactionKind::ThumbsUp,
        ReactionKind::Happy,
        ReactionKind::Surprised,
        ReactionKind::Laughing,
        ReactionKind::HeartEyes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ThumbsUp => "THUMBS_UP",
            Self::Happy => "HAPPY",
            Self::Surprised => "SURPRISED",
            Self::Laughing => "LAUGHING",
            Self::HeartEyes => "HEART_EYES",
        }
    }
}

impl FromStr for ReactionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "reaction kind",
                value: s.to_string(),
            })
    }
}

/// A reusable selfie a user reacts with. Not shown until uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionImage {
    pub id: String,
    pub author_id: String,
    pub kind: ReactionKind,
    pub uploaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub id: String,
    pub zap_id: String,
    pub author_id: String,
    pub kind: ReactionKind,
    pub image_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendRequest {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
}

/// Undirected once stored; the sender/receiver order only records who asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Friendship {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
}

/// `user_id == None` marks the single server-wide invite. `code` is only
/// populated when the caller asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invite {
    pub id: String,
    pub user_id: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    ZapNow,
    FriendRequest,
    NewDailyZap,
    NewReaction,
    NewComment,
    Tagged,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 6] = [
        NotificationKind::ZapNow,
        NotificationKind::FriendRequest,
        NotificationKind::NewDailyZap,
        NotificationKind::NewReaction,
        NotificationKind::NewComment,
        NotificationKind::Tagged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZapNow => "ZAP_NOW",
            Self::FriendRequest => "FRIEND_REQUEST",
            Self::NewDailyZap => "NEW_DAILY_ZAP",
            Self::NewReaction => "NEW_REACTION",
            Self::NewComment => "NEW_COMMENT",
            Self::Tagged => "TAGGED",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "notification kind",
                value: s.to_string(),
            })
    }
}

/// Consumed (deleted) when read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub target_id: Option<String>,
}
