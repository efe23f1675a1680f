//! Blob addressing. Keys are derived from the owning entities, so a stored
//! object can be found again without any index.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use zap_types::models::{ReactionKind, ZapSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Avatars,
    Zaps,
    Reactions,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Avatars, Bucket::Zaps, Bucket::Reactions];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Avatars => "avatars",
            Self::Zaps => "zaps",
            Self::Reactions => "reactions",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown bucket '{}'", s))
    }
}

/// Issues time-limited URLs for reading and writing blobs.
pub trait AssetLocator: Send + Sync {
    fn presign(&self, bucket: Bucket, key: &str, ttl: Duration) -> Result<String>;
    fn presign_upload(&self, bucket: Bucket, key: &str, ttl: Duration) -> Result<String>;
    fn bucket_exists(&self, bucket: Bucket) -> Result<bool>;
    fn create_bucket(&self, bucket: Bucket) -> Result<()>;
}

/// Create any missing bucket. Run once at startup.
pub fn ensure_buckets(locator: &dyn AssetLocator) -> Result<()> {
    for bucket in Bucket::ALL {
        if !locator.bucket_exists(bucket)? {
            locator.create_bucket(bucket)?;
            info!("Created bucket {}", bucket);
        }
    }
    Ok(())
}

/// `{momentId}/{userId}/{zapId}-{side}.jpg` in [`Bucket::Zaps`].
pub fn zap_key(moment_id: &str, user_id: &str, zap_id: &str, side: ZapSide) -> String {
    format!("{}/{}/{}-{}.jpg", moment_id, user_id, zap_id, side.as_str())
}

/// `{authorId}/{kind}/{imageId}.jpg` in [`Bucket::Reactions`].
pub fn reaction_key(author_id: &str, kind: ReactionKind, image_id: &str) -> String {
    format!("{}/{}/{}.jpg", author_id, kind.as_str(), image_id)
}

/// `{userId}.jpg` in [`Bucket::Avatars`].
pub fn avatar_key(user_id: &str) -> String {
    format!("{}.jpg", user_id)
}

/// Stable, permission-checked reference to a profile picture. The version
/// query parameter changes on every upload and busts client caches.
pub fn profile_picture_url(public_url: &str, user_id: &str, version: i64) -> String {
    format!(
        "{}/v1/users/{}/profile/picture?v={}",
        public_url.trim_end_matches('/'),
        user_id,
        version
    )
}
