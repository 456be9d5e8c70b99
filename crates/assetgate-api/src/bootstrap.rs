//! # Startup Wiring
//!
//! Builds [`AppState`] from an [`AppConfig`]: opens the storage backend,
//! connects the catalog (running migrations) and assembles the gateway.

use assetgate_storage::{LocalStorage, RemoteStorage, StorageBackend, StorageError};

use crate::catalog::{Catalog, MemoryCatalog};
use crate::config::{AppConfig, StorageConfig};
use crate::db;
use crate::gateway::{AssetGateway, GatewayOptions};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("storage initialization failed: {0}")]
    Storage(#[from] StorageError),
    #[error("database initialization failed: {0}")]
    Database(#[from] sqlx::Error),
}

pub async fn open_storage(config: &StorageConfig) -> Result<StorageBackend, StorageError> {
    Ok(match config {
        StorageConfig::Local { root } => LocalStorage::open(root).await?.into(),
        StorageConfig::Remote(settings) => RemoteStorage::connect(settings.clone()).await.into(),
    })
}

pub async fn open_catalog(database_url: Option<&str>) -> Result<Catalog, sqlx::Error> {
    Ok(match db::init_pool(database_url).await? {
        Some(pool) => Catalog::Postgres(pool),
        None => MemoryCatalog::new().into(),
    })
}

pub async fn bootstrap(config: AppConfig) -> Result<AppState, BootstrapError> {
    let storage = open_storage(&config.storage).await?;
    let catalog = open_catalog(config.database_url.as_deref()).await?;
    let gateway = AssetGateway::new(storage, catalog, GatewayOptions::from_config(&config));

    tracing::info!(
        storage = gateway.storage().kind(),
        catalog = gateway.catalog().kind(),
        max_upload_bytes = gateway.policy().max_upload_bytes,
        "asset gateway initialized"
    );
    Ok(AppState::new(config, gateway))
}
