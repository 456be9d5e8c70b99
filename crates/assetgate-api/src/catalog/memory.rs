//! In-memory catalog used when no database is configured.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{Asset, NewAsset};

/// Thread-safe, cloneable map from filename to [`Asset`].
///
/// The lock is `parking_lot` and never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    rows: Arc<RwLock<HashMap<String, Asset>>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, filename: &str) -> Option<Asset> {
        self.rows.read().get(filename).cloned()
    }

    pub fn upsert(&self, asset: NewAsset, at: DateTime<Utc>) -> Asset {
        let mut rows = self.rows.write();
        let row = rows
            .entry(asset.filename.as_str().to_string())
            .and_modify(|existing| {
                existing.file_size = asset.file_size;
                existing.upload_date = at;
                existing.last_accessed_date = at;
            })
            .or_insert_with(|| Asset {
                id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                filename: asset.filename.as_str().to_string(),
                file_type: asset.file_type.clone(),
                file_size: asset.file_size,
                upload_date: at,
                last_accessed_date: at,
            });
        row.clone()
    }

    pub fn touch(&self, filename: &str, at: DateTime<Utc>) -> bool {
        match self.rows.write().get_mut(filename) {
            Some(row) => {
                row.last_accessed_date = at;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, filename: &str) -> bool {
        self.rows.write().remove(filename).is_some()
    }

    pub fn accessed_before(&self, threshold: DateTime<Utc>) -> Vec<Asset> {
        let mut stale: Vec<Asset> = self
            .rows
            .read()
            .values()
            .filter(|a| a.last_accessed_date < threshold)
            .cloned()
            .collect();
        stale.sort_by(|a, b| {
            a.last_accessed_date
                .cmp(&b.last_accessed_date)
                .then(a.id.cmp(&b.id))
        });
        stale
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}
