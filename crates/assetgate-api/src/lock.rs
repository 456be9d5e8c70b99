//! # Per-Filename Locks
//!
//! Uploads and sweeper evictions take the write side for their filename;
//! catalog-mutating reads take the read side. Different filenames never
//! contend. An entry is removed from the map when its last guard drops, so
//! the map only holds filenames with in-flight operations.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

type LockMap = DashMap<String, Arc<RwLock<()>>>;

#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    inner: Arc<LockMap>,
}

/// The guard is only held for its `Drop`.
enum Held {
    Read { _guard: OwnedRwLockReadGuard<()> },
    Write { _guard: OwnedRwLockWriteGuard<()> },
}

/// Holds one side of a filename's lock until dropped.
pub struct KeyGuard {
    held: Option<Held>,
    key: String,
    map: Arc<LockMap>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self, key: &str) -> KeyGuard {
        let lock = self.lock_for(key);
        let guard = lock.read_owned().await;
        self.guard(key, Held::Read { _guard: guard })
    }

    pub async fn write(&self, key: &str) -> KeyGuard {
        let lock = self.lock_for(key);
        let guard = lock.write_owned().await;
        self.guard(key, Held::Write { _guard: guard })
    }

    /// Number of filenames with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn lock_for(&self, key: &str) -> Arc<RwLock<()>> {
        // The shard guard is released at the end of this statement.
        Arc::clone(self.inner.entry(key.to_string()).or_default().value())
    }

    fn guard(&self, key: &str, held: Held) -> KeyGuard {
        KeyGuard {
            held: Some(held),
            key: key.to_string(),
            map: Arc::clone(&self.inner),
        }
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.held.take());
        // Waiters and other holders each own a clone, so a count of one means
        // only the map still references this lock.
        self.map
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl std::fmt::Debug for KeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.held {
            Some(Held::Read { .. }) => "read",
            Some(Held::Write { .. }) => "write",
            None => "released",
        };
        f.debug_struct("KeyGuard")
            .field("key", &self.key)
            .field("mode", &mode)
            .finish()
    }
}
