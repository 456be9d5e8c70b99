//! # Local Filesystem Backend
//!
//! Assets live flat under a single root directory, one file per
//! [`AssetName`]. The root is created when the backend is opened.
//!
//! ## Atomicity
//!
//! `save` writes a hidden staging file `.{name}.{uuid}.tmp` in the root,
//! fsyncs it and renames it over the target. A concurrent reader sees either
//! the previous content or the new content, never a prefix. Asset names
//! cannot start with `.`, so staging files never collide with assets.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use assetgate_core::AssetName;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::StorageError;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open a backend rooted at `root`, creating the directory if missing.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        tracing::info!(root = %root.display(), "local storage ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The on-disk path for `name`. The file may not exist.
    pub fn local_path(&self, name: &AssetName) -> PathBuf {
        self.root.join(name.as_str())
    }

    pub async fn save(&self, name: &AssetName, data: &[u8]) -> Result<(), StorageError> {
        let target = self.local_path(name);
        let staging = self
            .root
            .join(format!(".{}.{}.tmp", name.as_str(), uuid::Uuid::new_v4()));

        if let Err(e) = write_synced(&staging, data).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&staging, &target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn exists(&self, name: &AssetName) -> Result<bool, StorageError> {
        match fs::metadata(self.local_path(name)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the file. Returns `Ok(false)` if it was already gone.
    pub async fn delete(&self, name: &AssetName) -> Result<bool, StorageError> {
        match fs::remove_file(self.local_path(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}
