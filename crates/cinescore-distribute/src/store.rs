//! Remote artifact store backends.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use cinescore_core::config::{StoreConfig, StoreKind};
use cinescore_core::error::{CinescoreError, Result};

/// Object store holding the distributed artifact set.
///
/// Keys are slash-separated paths relative to the bucket.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Fetch an object. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}

/// Bucket backed by a directory, e.g. a mounted volume shared between the
/// pipeline host and the serving hosts.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(CinescoreError::Transfer(format!("invalid object key '{}'", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for FsStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_of(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("upload");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), "Object stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_of(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CinescoreError::Transfer(format!("{}: {}", path.display(), e))),
        }
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

/// Object store reached with plain `PUT`/`GET` on `{endpoint}/{bucket}/{key}`.
///
/// Credentials, when configured, are sent as HTTP basic auth.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl HttpStore {
    pub fn new(endpoint: &str, bucket: &str, credentials: Option<(String, String)>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| CinescoreError::Transfer(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
            credentials,
        })
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some((id, secret)) => request.basic_auth(id, Some(secret)),
            None => request,
        }
    }
}

#[async_trait]
impl ArtifactStore for HttpStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let url = self.url(key);
        let response = self
            .authorize(self.client.put(&url).body(bytes))
            .send()
            .await
            .map_err(|e| CinescoreError::Transfer(format!("PUT {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(CinescoreError::Transfer(format!(
                "PUT {}: status {}",
                url,
                response.status()
            )));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let url = self.url(key);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| CinescoreError::Transfer(format!("GET {}: {}", url, e)))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CinescoreError::Transfer(format!(
                "GET {}: status {}",
                url,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CinescoreError::Transfer(format!("GET {}: {}", url, e)))?;
        Ok(Some(bytes.to_vec()))
    }

    fn location(&self) -> String {
        self.base_url.clone()
    }
}

/// Build the configured store, or `None` when no bucket is configured.
pub fn store_from_config(config: &StoreConfig) -> Result<Option<Box<dyn ArtifactStore>>> {
    let Some(bucket) = config.bucket.as_deref().filter(|b| !b.trim().is_empty()) else {
        return Ok(None);
    };

    let store: Box<dyn ArtifactStore> = match config.kind {
        StoreKind::Fs => {
            let root = config.endpoint.as_deref().unwrap_or("./artifact-store");
            Box::new(FsStore::new(Path::new(root).join(bucket)))
        }
        StoreKind::Http => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                CinescoreError::Config("store.kind = \"http\" requires store.endpoint".to_string())
            })?;
            let credentials = match (&config.access_key_id, &config.secret_access_key) {
                (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
                (None, None) => None,
                _ => {
                    warn!("Only one of access key id and secret is set; sending no credentials");
                    None
                }
            };
            Box::new(HttpStore::new(endpoint, bucket, credentials)?)
        }
    };
    debug!(location = %store.location(), region = %config.region, "Artifact store configured");
    Ok(Some(store))
}
