//! # Asset Catalog
//!
//! Metadata per filename: declared media type, size, upload time and last
//! access. A row exists exactly while the asset is live.
//!
//! Two implementations behind the closed [`Catalog`] enum: Postgres when
//! `DATABASE_URL` is configured, a process-local map otherwise.

pub mod memory;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use assetgate_core::AssetName;

use crate::db;

pub use memory::MemoryCatalog;

/// A catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub id: i64,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub upload_date: DateTime<Utc>,
    pub last_accessed_date: DateTime<Utc>,
}

/// Attributes recorded by an upload.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub filename: AssetName,
    pub file_type: String,
    pub file_size: i64,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog query failed: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub enum Catalog {
    Postgres(PgPool),
    Memory(MemoryCatalog),
}

impl Catalog {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    pub async fn find_by_filename(&self, name: &AssetName) -> Result<Option<Asset>, CatalogError> {
        match self {
            Self::Postgres(pool) => Ok(db::assets::get_by_filename(pool, name.as_str()).await?),
            Self::Memory(mem) => Ok(mem.get(name.as_str())),
        }
    }

    /// Insert with `upload_date = last_accessed_date = at`, or update size,
    /// upload date and last access of the existing row.
    pub async fn upsert(&self, asset: NewAsset, at: DateTime<Utc>) -> Result<Asset, CatalogError> {
        match self {
            Self::Postgres(pool) => Ok(db::assets::upsert(pool, &asset, at).await?),
            Self::Memory(mem) => Ok(mem.upsert(asset, at)),
        }
    }

    pub async fn touch(&self, name: &AssetName, at: DateTime<Utc>) -> Result<bool, CatalogError> {
        match self {
            Self::Postgres(pool) => Ok(db::assets::touch(pool, name.as_str(), at).await?),
            Self::Memory(mem) => Ok(mem.touch(name.as_str(), at)),
        }
    }

    pub async fn delete(&self, name: &AssetName) -> Result<bool, CatalogError> {
        match self {
            Self::Postgres(pool) => Ok(db::assets::delete(pool, name.as_str()).await?),
            Self::Memory(mem) => Ok(mem.remove(name.as_str())),
        }
    }

    /// Rows last accessed strictly before `threshold`, oldest first.
    pub async fn find_accessed_before(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<Asset>, CatalogError> {
        match self {
            Self::Postgres(pool) => Ok(db::assets::list_accessed_before(pool, threshold).await?),
            Self::Memory(mem) => Ok(mem.accessed_before(threshold)),
        }
    }

    pub async fn ping(&self) -> Result<(), CatalogError> {
        match self {
            Self::Postgres(pool) => Ok(db::assets::ping(pool).await?),
            Self::Memory(_) => Ok(()),
        }
    }
}

impl From<MemoryCatalog> for Catalog {
    fn from(mem: MemoryCatalog) -> Self {
        Self::Memory(mem)
    }
}
