//! # Storage Backend
//!
//! The closed set of backends, selected once at startup. Callers match on
//! the variant only where behavior genuinely differs (serving reads); the
//! write, probe and delete paths go through the uniform methods here.

use std::path::PathBuf;

use assetgate_core::AssetName;
use bytes::Bytes;

use crate::error::StorageError;
use crate::local::LocalStorage;
use crate::remote::RemoteStorage;

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Local(LocalStorage),
    Remote(RemoteStorage),
}

impl StorageBackend {
    /// Stable label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Remote(_) => "remote",
        }
    }

    /// Persist the full content of `name`, replacing any previous object.
    pub async fn save(
        &self,
        name: &AssetName,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        match self {
            Self::Local(local) => local.save(name, &data).await,
            Self::Remote(remote) => remote.save(name, data, content_type).await,
        }
    }

    pub async fn exists(&self, name: &AssetName) -> Result<bool, StorageError> {
        match self {
            Self::Local(local) => local.exists(name).await,
            Self::Remote(remote) => remote.exists(name).await,
        }
    }

    pub async fn delete(&self, name: &AssetName) -> Result<bool, StorageError> {
        match self {
            Self::Local(local) => local.delete(name).await,
            Self::Remote(remote) => remote.delete(name).await,
        }
    }

    /// On-disk path for direct serving. Remote storage has none.
    pub fn local_path(&self, name: &AssetName) -> Result<PathBuf, StorageError> {
        match self {
            Self::Local(local) => Ok(local.local_path(name)),
            Self::Remote(_) => Err(StorageError::Unsupported {
                op: "local_path",
                backend: "remote",
            }),
        }
    }
}

impl From<LocalStorage> for StorageBackend {
    fn from(local: LocalStorage) -> Self {
        Self::Local(local)
    }
}

impl From<RemoteStorage> for StorageBackend {
    fn from(remote: RemoteStorage) -> Self {
        Self::Remote(remote)
    }
}
