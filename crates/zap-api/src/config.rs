use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use zap_core::Settings;
use zap_types::models::Region;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_url: String,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub storage_dir: PathBuf,
    pub signing_key: String,
    pub url_ttl: Duration,
    pub late_grace: Duration,
    pub region: Region,
    pub push_gateway_url: Option<String>,
    pub moment_sync_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("DAILYZAP_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("DAILYZAP_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = match get("DAILYZAP_PORT") {
            Some(v) => v.parse().context("DAILYZAP_PORT")?,
            None => 3000,
        };
        let url_ttl_secs: u64 = match get("DAILYZAP_URL_TTL_SECS") {
            Some(v) => v.parse().context("DAILYZAP_URL_TTL_SECS")?,
            None => 900,
        };
        let late_grace_secs: u64 = match get("DAILYZAP_LATE_GRACE_SECS") {
            Some(v) => v.parse().context("DAILYZAP_LATE_GRACE_SECS")?,
            None => 120,
        };
        let moment_sync_secs: u64 = match get("DAILYZAP_MOMENT_SYNC_SECS") {
            Some(v) => v.parse().context("DAILYZAP_MOMENT_SYNC_SECS")?,
            None => 60,
        };
        if url_ttl_secs == 0 || moment_sync_secs == 0 {
            bail!("URL TTL and moment sync interval must be positive");
        }
        let region: Region = match get("DAILYZAP_REGION") {
            Some(v) => v.parse()?,
            None => Region::Eu,
        };

        Ok(Self {
            host: get("DAILYZAP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            public_url: get("DAILYZAP_PUBLIC_URL")
                .unwrap_or_else(|| "http://localhost:3000".into())
                .trim_end_matches('/')
                .to_string(),
            db_path: get("DAILYZAP_DB_PATH")
                .unwrap_or_else(|| "dailyzap.db".into())
                .into(),
            signing_key: get("DAILYZAP_SIGNING_KEY").unwrap_or_else(|| jwt_secret.clone()),
            jwt_secret,
            storage_dir: get("DAILYZAP_STORAGE_DIR")
                .unwrap_or_else(|| "./blob-storage".into())
                .into(),
            url_ttl: Duration::from_secs(url_ttl_secs),
            late_grace: Duration::from_secs(late_grace_secs),
            region,
            push_gateway_url: get("DAILYZAP_PUSH_GATEWAY_URL"),
            moment_sync_secs,
        })
    }

    /// The subset the core needs.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        Ok(Settings {
            public_url: self.public_url.clone(),
            url_ttl: self.url_ttl,
            late_grace: chrono::Duration::from_std(self.late_grace)?,
        })
    }

    /// `host[:port]` of the public URL, as embedded in invite deep links.
    pub fn public_host(&self) -> &str {
        let without_scheme = self
            .public_url
            .split_once("://")
            .map_or(self.public_url.as_str(), |(_, rest)| rest);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }
}
