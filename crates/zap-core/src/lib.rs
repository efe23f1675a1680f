//! Decision and aggregation core: who may see which asset, which Moment is
//! current for a region, and how a user's daily feed is put together.
//!
//! Nothing here knows about HTTP. Persistence and blob storage come in through
//! the [`store::Store`] and [`assets::AssetLocator`] traits.

pub mod access;
pub mod assets;
pub mod error;
pub mod feed;
pub mod friends;
pub mod invites;
pub mod moments;
pub mod notifications;
pub mod profiles;
pub mod store;
pub mod zaps;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

/// Deployment-level knobs the core needs.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Externally reachable base URL, without a trailing slash.
    pub public_url: String,
    /// Validity of presigned asset URLs.
    pub url_ttl: Duration,
    /// How long after a Moment activates a Zap still counts as on time.
    pub late_grace: chrono::Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:3000".into(),
            url_ttl: Duration::from_secs(15 * 60),
            late_grace: chrono::Duration::minutes(2),
        }
    }
}
