//! # Asset Gateway
//!
//! Orchestrates the three request-path operations over the storage backend,
//! the catalog, the caches and the per-filename locks.
//!
//! ## Upload
//!
//! Name guard, declared size, declared media type, then the body is
//! streamed into a bounded buffer while being hashed. Only content whose
//! digest equals the filename's base name is saved. The backend write
//! happens before the catalog upsert, both under the filename's write
//! lock, so a failed save never leaves a catalog row behind.
//!
//! ## Read
//!
//! A filename checked within the cooldown window is served without touching
//! the catalog. Otherwise the row is looked up and its last access advanced
//! under the read lock. Local assets are served from disk, remote ones by
//! redirect.
//!
//! ## Probe
//!
//! Existence cache, then catalog. Optionally confirms the backend object.

use std::path::PathBuf;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::{Stream, StreamExt};
use thiserror::Error;

use assetgate_core::{AssetName, NameError, Sha256Digester, UploadPolicy, UploadPolicyError};
use assetgate_storage::{StorageBackend, StorageError};

use crate::cache::{AccessCache, ExistenceCache};
use crate::catalog::{Asset, Catalog, CatalogError, NewAsset};
use crate::config::AppConfig;
use crate::lock::KeyedLocks;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error(transparent)]
    Policy(#[from] UploadPolicyError),

    #[error("filename claims digest {expected} but content hashes to {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("failed to read request body: {0}")]
    Body(String),

    #[error("asset {0} not found")]
    NotFound(String),

    #[error("asset {0} is listed in the catalog but missing from storage")]
    Inconsistent(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Tunables for [`AssetGateway`].
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub policy: UploadPolicy,
    pub read_cooldown: Duration,
    pub cache_capacity: u64,
    pub existence_cache_ttl: Duration,
    pub probe_checks_backend: bool,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            policy: UploadPolicy::default(),
            read_cooldown: Duration::from_secs(3600),
            cache_capacity: 100_000,
            existence_cache_ttl: Duration::from_secs(86_400),
            probe_checks_backend: false,
        }
    }
}

impl GatewayOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            policy: UploadPolicy::new(config.max_upload_bytes, &config.allowed_media_types),
            read_cooldown: config.read_cooldown,
            cache_capacity: config.cache_capacity,
            existence_cache_ttl: config.existence_cache_ttl,
            probe_checks_backend: config.probe_checks_backend,
        }
    }
}

/// Metadata accompanying an upload body.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub filename: &'a str,
    pub content_type: Option<&'a str>,
    /// `Content-Length` when the client sent one.
    pub declared_size: Option<u64>,
}

/// How a successful read is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Local { name: AssetName, path: PathBuf },
    Redirect { url: String },
}

#[derive(Debug)]
pub struct AssetGateway {
    storage: StorageBackend,
    catalog: Catalog,
    policy: UploadPolicy,
    access: AccessCache,
    existence: ExistenceCache,
    locks: KeyedLocks,
    probe_checks_backend: bool,
}

impl AssetGateway {
    pub fn new(storage: StorageBackend, catalog: Catalog, options: GatewayOptions) -> Self {
        Self {
            access: AccessCache::new(options.cache_capacity, options.read_cooldown),
            existence: ExistenceCache::new(options.cache_capacity, options.existence_cache_ttl),
            storage,
            catalog,
            policy: options.policy,
            locks: KeyedLocks::new(),
            probe_checks_backend: options.probe_checks_backend,
        }
    }

    pub fn storage(&self) -> &StorageBackend {
        &self.storage
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub(crate) fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    /// Drop both cache entries for an evicted asset.
    pub(crate) fn forget(&self, name: &AssetName) {
        self.access.invalidate(name.as_str());
        self.existence.invalidate(name.as_str());
    }

    /// Verify, store and catalog an asset.
    pub async fn upload<S, E>(
        &self,
        request: UploadRequest<'_>,
        body: S,
    ) -> Result<Asset, GatewayError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let name = AssetName::parse(request.filename)?;
        if let Some(declared) = request.declared_size {
            self.policy.check_size(declared)?;
        }
        let media_type = self.policy.check_media_type(request.content_type)?;

        let data = self.read_verified(&name, request.declared_size, body).await?;
        let size = data.len() as i64;

        let _guard = self.locks.write(name.as_str()).await;
        self.storage.save(&name, data, &media_type).await?;
        let asset = self
            .catalog
            .upsert(
                NewAsset {
                    filename: name.clone(),
                    file_type: media_type,
                    file_size: size,
                },
                Utc::now(),
            )
            .await?;
        self.existence.mark(name.as_str());

        tracing::info!(
            filename = %name,
            size,
            backend = self.storage.kind(),
            "asset stored"
        );
        Ok(asset)
    }

    /// Buffer the body up to the size ceiling and check its digest.
    async fn read_verified<S, E>(
        &self,
        name: &AssetName,
        declared_size: Option<u64>,
        body: S,
    ) -> Result<Bytes, GatewayError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let max = self.policy.max_upload_bytes;
        let capacity = declared_size.unwrap_or(0).min(max).min(8 * 1024 * 1024) as usize;
        let mut buffer = BytesMut::with_capacity(capacity);
        let mut digester = Sha256Digester::new();

        let mut body = std::pin::pin!(body);
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| GatewayError::Body(e.to_string()))?;
            self.policy.check_size(digester.len() + chunk.len() as u64)?;
            digester.update(&chunk);
            buffer.extend_from_slice(&chunk);
        }

        let actual = digester.finalize().to_hex();
        if !name.matches_digest(&actual) {
            tracing::warn!(filename = %name, actual = %actual, "upload rejected: content hash mismatch");
            return Err(GatewayError::HashMismatch {
                expected: name.base_name().to_string(),
                actual,
            });
        }
        Ok(buffer.freeze())
    }

    /// Resolve how to serve `filename`.
    pub async fn read(&self, filename: &str) -> Result<ReadOutcome, GatewayError> {
        let name = AssetName::parse(filename)?;
        let now = Utc::now();

        if self.access.recently_checked(name.as_str(), now) {
            tracing::debug!(filename = %name, "read within cooldown; catalog skipped");
            return match &self.storage {
                StorageBackend::Local(_) => {
                    if self.storage.exists(&name).await? {
                        Ok(self.local_outcome(name)?)
                    } else {
                        Err(GatewayError::NotFound(name.to_string()))
                    }
                }
                StorageBackend::Remote(remote) => Ok(ReadOutcome::Redirect {
                    url: remote.public_url(&name),
                }),
            };
        }

        {
            let _guard = self.locks.read(name.as_str()).await;
            if self.catalog.find_by_filename(&name).await?.is_none() {
                return Err(GatewayError::NotFound(name.to_string()));
            }
            self.catalog.touch(&name, now).await?;
            self.access.record(name.as_str(), now);
        }

        match &self.storage {
            StorageBackend::Local(_) => {
                if !self.storage.exists(&name).await? {
                    tracing::warn!(filename = %name, "catalog row without a stored file");
                    return Err(GatewayError::Inconsistent(name.to_string()));
                }
                Ok(self.local_outcome(name)?)
            }
            StorageBackend::Remote(remote) => Ok(ReadOutcome::Redirect {
                url: remote.public_url(&name),
            }),
        }
    }

    fn local_outcome(&self, name: AssetName) -> Result<ReadOutcome, StorageError> {
        let path = self.storage.local_path(&name)?;
        Ok(ReadOutcome::Local { name, path })
    }

    /// `Ok(())` when the asset exists.
    pub async fn probe(&self, filename: &str) -> Result<(), GatewayError> {
        let name = AssetName::parse(filename)?;
        if self.existence.contains(name.as_str()) {
            return Ok(());
        }

        if self.catalog.find_by_filename(&name).await?.is_none() {
            return Err(GatewayError::NotFound(name.to_string()));
        }
        if self.probe_checks_backend && !self.storage.exists(&name).await? {
            tracing::warn!(filename = %name, "probe: catalog row without a stored object");
            return Err(GatewayError::Inconsistent(name.to_string()));
        }
        self.existence.mark(name.as_str());
        Ok(())
    }
}
