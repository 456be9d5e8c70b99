//! # Retention Sweeper
//!
//! Evicts assets whose last access is older than the retention window.
//!
//! Each candidate is re-read under the filename's write lock, so an asset
//! read or re-uploaded after the candidate scan survives. The backend object
//! is deleted before the catalog row. If the backend delete fails the row is
//! kept and the asset is retried on the next pass.
//!
//! Runs periodically off the request path ([`spawn`], stopped through
//! [`SweeperHandle::shutdown`]) and on demand from
//! the `assetgate sweep` command ([`RetentionSweeper::sweep_once`]).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use assetgate_core::AssetName;

use crate::catalog::{Asset, CatalogError};
use crate::gateway::AssetGateway;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Candidates returned by the catalog scan.
    pub examined: usize,
    pub evicted: usize,
    /// Touched, re-uploaded or removed after the scan.
    pub skipped: usize,
    /// Backend or catalog failures. The catalog row is kept.
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    gateway: Arc<AssetGateway>,
    retention: chrono::Duration,
}

impl RetentionSweeper {
    pub fn new(gateway: Arc<AssetGateway>, retention_days: u32) -> Self {
        Self {
            gateway,
            retention: chrono::Duration::days(i64::from(retention_days)),
        }
    }

    pub fn threshold(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.retention
    }

    /// Assets that a pass at `now` would evict. Nothing is modified.
    pub async fn candidates(&self, now: DateTime<Utc>) -> Result<Vec<Asset>, CatalogError> {
        self.gateway
            .catalog()
            .find_accessed_before(self.threshold(now))
            .await
    }

    /// Run one eviction pass.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport, CatalogError> {
        let threshold = self.threshold(now);
        let candidates = self.gateway.catalog().find_accessed_before(threshold).await?;
        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };

        for asset in candidates {
            let name = match AssetName::parse(&asset.filename) {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(filename = %asset.filename, error = %e, "sweep: unusable filename in catalog");
                    report.failed += 1;
                    continue;
                }
            };
            match self.evict(&name, threshold).await {
                Ok(true) => report.evicted += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!(filename = %name, error = %e, "sweep: eviction failed; row kept");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            examined = report.examined,
            evicted = report.evicted,
            skipped = report.skipped,
            failed = report.failed,
            "retention sweep finished"
        );
        Ok(report)
    }

    /// Returns `Ok(false)` when the asset no longer qualifies.
    async fn evict(&self, name: &AssetName, threshold: DateTime<Utc>) -> Result<bool, EvictError> {
        let gateway = &self.gateway;
        let _guard = gateway.locks().write(name.as_str()).await;

        match gateway.catalog().find_by_filename(name).await? {
            Some(current) if current.last_accessed_date < threshold => {}
            _ => return Ok(false),
        }

        gateway.storage().delete(name).await?;
        gateway.catalog().delete(name).await?;
        gateway.forget(name);

        tracing::info!(filename = %name, backend = gateway.storage().kind(), "asset evicted");
        Ok(true)
    }
}

#[derive(Debug, thiserror::Error)]
enum EvictError {
    #[error(transparent)]
    Storage(#[from] assetgate_storage::StorageError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Running periodic sweep. A pass in progress always completes before the
/// task observes cancellation.
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the loop and wait for the current pass to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "retention sweeper task failed");
        }
    }
}

/// Start the periodic sweep. The first pass runs immediately.
pub fn spawn(sweeper: RetentionSweeper, period: Duration) -> SweeperHandle {
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_sweep_loop(sweeper, period, cancel.clone()));
    SweeperHandle { cancel, task }
}

async fn run_sweep_loop(sweeper: RetentionSweeper, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        interval_secs = period.as_secs(),
        retention_days = sweeper.retention.num_days(),
        "retention sweeper started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("retention sweeper shutting down");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = sweeper.sweep_once(Utc::now()).await {
                    tracing::warn!(error = %e, "retention sweep failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, NewAsset};
    use crate::gateway::{GatewayOptions, ReadOutcome, UploadRequest};
    use assetgate_core::compute_digest;
    use assetgate_storage::LocalStorage;
    use bytes::Bytes;
    use std::convert::Infallible;

    async fn setup(dir: &std::path::Path) -> Arc<AssetGateway> {
        let storage = LocalStorage::open(dir).await.unwrap();
        Arc::new(AssetGateway::new(
            storage.into(),
            MemoryCatalog::new().into(),
            GatewayOptions::default(),
        ))
    }

    async fn store(gw: &AssetGateway, data: &[u8]) -> String {
        let filename = format!("{}.png", compute_digest(data));
        let body = futures::stream::iter(vec![Ok::<_, Infallible>(Bytes::copy_from_slice(data))]);
        gw.upload(
            UploadRequest {
                filename: &filename,
                content_type: Some("image/png"),
                declared_size: None,
            },
            body,
        )
        .await
        .unwrap();
        filename
    }

    async fn backdate(gw: &AssetGateway, filename: &str, days: i64) {
        let name = AssetName::parse(filename).unwrap();
        gw.catalog()
            .touch(&name, Utc::now() - chrono::Duration::days(days))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stale_assets_evicted_recent_kept() {
        let dir = tempfile::tempdir().unwrap();
        let gw = setup(dir.path()).await;
        let stale = store(&gw, b"stale").await;
        let fresh = store(&gw, b"fresh").await;
        backdate(&gw, &stale, 61).await;
        backdate(&gw, &fresh, 59).await;

        let sweeper = RetentionSweeper::new(gw.clone(), 60);
        let report = sweeper.sweep_once(Utc::now()).await.unwrap();

        assert_eq!(
            report,
            SweepReport {
                examined: 1,
                evicted: 1,
                skipped: 0,
                failed: 0
            }
        );
        let stale_name = AssetName::parse(&stale).unwrap();
        let fresh_name = AssetName::parse(&fresh).unwrap();
        assert!(gw.catalog().find_by_filename(&stale_name).await.unwrap().is_none());
        assert!(!dir.path().join(&stale).exists());
        assert!(gw.catalog().find_by_filename(&fresh_name).await.unwrap().is_some());
        assert!(dir.path().join(&fresh).exists());
    }

    #[tokio::test]
    async fn eviction_invalidates_caches() {
        let dir = tempfile::tempdir().unwrap();
        let gw = setup(dir.path()).await;
        let filename = store(&gw, b"cached then evicted").await;
        assert!(matches!(gw.read(&filename).await.unwrap(), ReadOutcome::Local { .. }));
        gw.probe(&filename).await.unwrap();
        backdate(&gw, &filename, 90).await;

        RetentionSweeper::new(gw.clone(), 60)
            .sweep_once(Utc::now())
            .await
            .unwrap();

        assert!(gw.read(&filename).await.is_err());
        assert!(gw.probe(&filename).await.is_err());
    }

    #[tokio::test]
    async fn backend_failure_keeps_row() {
        let dir = tempfile::tempdir().unwrap();
        let gw = setup(dir.path()).await;
        // A directory at the asset path makes the file delete fail.
        let filename = format!("{}.png", compute_digest(b"stuck"));
        std::fs::create_dir(dir.path().join(&filename)).unwrap();
        gw.catalog()
            .upsert(
                NewAsset {
                    filename: AssetName::parse(&filename).unwrap(),
                    file_type: "image/png".into(),
                    file_size: 5,
                },
                Utc::now() - chrono::Duration::days(100),
            )
            .await
            .unwrap();

        let report = RetentionSweeper::new(gw.clone(), 60)
            .sweep_once(Utc::now())
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.evicted, 0);
        let name = AssetName::parse(&filename).unwrap();
        assert!(gw.catalog().find_by_filename(&name).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn candidates_do_not_modify() {
        let dir = tempfile::tempdir().unwrap();
        let gw = setup(dir.path()).await;
        let filename = store(&gw, b"dry run").await;
        backdate(&gw, &filename, 70).await;

        let sweeper = RetentionSweeper::new(gw.clone(), 60);
        let listed = sweeper.candidates(Utc::now()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, filename);
        assert!(dir.path().join(&filename).exists());
    }

    #[tokio::test]
    async fn row_touched_after_scan_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let gw = setup(dir.path()).await;
        let filename = store(&gw, b"revived").await;
        backdate(&gw, &filename, 70).await;

        let sweeper = RetentionSweeper::new(gw.clone(), 60);
        let name = AssetName::parse(&filename).unwrap();
        let threshold = sweeper.threshold(Utc::now());
        gw.catalog().touch(&name, Utc::now()).await.unwrap();

        assert!(!sweeper.evict(&name, threshold).await.unwrap());
        assert!(dir.path().join(&filename).exists());
    }

    #[tokio::test]
    async fn spawned_loop_evicts_then_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let gw = setup(dir.path()).await;
        let filename = store(&gw, b"periodic").await;
        backdate(&gw, &filename, 70).await;

        let handle = spawn(RetentionSweeper::new(gw.clone(), 60), Duration::from_secs(3600));
        // The first tick fires immediately.
        let name = AssetName::parse(&filename).unwrap();
        for _ in 0..50 {
            if gw.catalog().find_by_filename(&name).await.unwrap().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(gw.catalog().find_by_filename(&name).await.unwrap().is_none());

        let token = handle.cancellation_token();
        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("sweeper task did not stop after cancellation");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_token_ends_the_task() {
        let dir = tempfile::tempdir().unwrap();
        let gw = setup(dir.path()).await;

        let handle = spawn(RetentionSweeper::new(gw, 60), Duration::from_secs(3600));
        handle.cancellation_token().cancel();

        let finished = tokio::time::timeout(Duration::from_secs(5), handle.task).await;
        assert!(matches!(finished, Ok(Ok(()))));
    }
}
