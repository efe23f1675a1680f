//! Filesystem blob store with presigned URLs.
//!
//! Each bucket is a directory under the storage root and each key a relative
//! path inside it. URLs carry an expiry and an HMAC over method, object path
//! and expiry, so the HTTP layer can serve and accept blobs without a session.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use zap_core::assets::{AssetLocator, Bucket};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    fn method(self) -> &'static str {
        match self {
            Self::Read => "GET",
            Self::Write => "PUT",
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid signature")]
    Invalid,
    #[error("url expired")]
    Expired,
}

pub struct LocalBlobStore {
    dir: PathBuf,
    public_url: String,
    signing_key: Vec<u8>,
}

impl LocalBlobStore {
    pub fn new(dir: PathBuf, public_url: &str, signing_key: &[u8]) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating blob root {}", dir.display()))?;
        info!("Blob storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_url: public_url.trim_end_matches('/').to_string(),
            signing_key: signing_key.to_vec(),
        })
    }

    /// Path of `key` inside `bucket`. Rejects anything that could escape it.
    pub fn object_path(&self, bucket: Bucket, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            bail!("empty object key");
        }
        let relative = Path::new(key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            bail!("invalid object key '{}'", key);
        }
        Ok(self.dir.join(bucket.as_str()).join(relative))
    }

    pub fn signed_url(&self, access: Access, bucket: Bucket, key: &str, expires: i64) -> Result<String> {
        let signature = self.signature(access, bucket, key, expires)?;
        Ok(format!(
            "{}/blobs/{}/{}?expires={}&signature={}",
            self.public_url, bucket, key, expires, signature
        ))
    }

    /// Checks a URL signature. Expiry is only reported for authentic URLs.
    pub fn verify(
        &self,
        access: Access,
        bucket: Bucket,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let provided = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SignatureError::Invalid)?;
        let mut mac = self.mac().map_err(|_| SignatureError::Invalid)?;
        mac.update(signing_input(access, bucket, key, expires).as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| SignatureError::Invalid)?;
        if now.timestamp() > expires {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }

    /// `None` when no such object exists.
    pub async fn read(&self, bucket: Bucket, key: &str) -> Result<Option<Bytes>> {
        let path = self.object_path(bucket, key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a sibling temp file first so readers never see a partial blob.
    /// Concurrent writers of one key each get their own temp file; the last
    /// rename wins.
    pub async fn write(&self, bucket: Bucket, key: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut tmp_name = path.file_name().map(OsStr::to_os_string).unwrap_or_default();
        tmp_name.push(format!(".{:016x}.part", rand::random::<u64>()));
        let tmp = path.with_file_name(tmp_name);

        let written = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&data).await?;
            file.flush().await?;
            drop(file);
            fs::rename(&tmp, &path).await
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!("Stored {}/{} ({} bytes)", bucket, key, data.len());
        Ok(())
    }

    fn signature(&self, access: Access, bucket: Bucket, key: &str, expires: i64) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(signing_input(access, bucket, key, expires).as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.signing_key).map_err(|e| anyhow::anyhow!("bad signing key: {}", e))
    }

    fn expiry(ttl: Duration) -> i64 {
        Utc::now().timestamp() + ttl.as_secs() as i64
    }
}

fn signing_input(access: Access, bucket: Bucket, key: &str, expires: i64) -> String {
    format!("{}\n{}/{}\n{}", access.method(), bucket, key, expires)
}

impl AssetLocator for LocalBlobStore {
    fn presign(&self, bucket: Bucket, key: &str, ttl: Duration) -> Result<String> {
        self.object_path(bucket, key)?;
        self.signed_url(Access::Read, bucket, key, Self::expiry(ttl))
    }

    fn presign_upload(&self, bucket: Bucket, key: &str, ttl: Duration) -> Result<String> {
        self.object_path(bucket, key)?;
        self.signed_url(Access::Write, bucket, key, Self::expiry(ttl))
    }

    fn bucket_exists(&self, bucket: Bucket) -> Result<bool> {
        Ok(self.dir.join(bucket.as_str()).is_dir())
    }

    fn create_bucket(&self, bucket: Bucket) -> Result<()> {
        std::fs::create_dir_all(self.dir.join(bucket.as_str()))?;
        Ok(())
    }
}
