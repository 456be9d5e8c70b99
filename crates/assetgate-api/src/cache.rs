//! # Request-Path Caches
//!
//! Both caches are bounded `moka` caches with a time-to-live, so they
//! neither grow without limit nor need a manual purge. They are
//! per-process hints: a miss always falls back to the catalog.
//!
//! - [`AccessCache`]: filenames whose catalog row was checked within the
//!   read cooldown window. A hit skips the catalog lookup and the
//!   last-access update entirely.
//! - [`ExistenceCache`]: filenames known to exist, used by the probe.

use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache as MokaCache;

#[derive(Clone)]
pub struct AccessCache {
    inner: MokaCache<String, DateTime<Utc>>,
    cooldown: Duration,
}

impl AccessCache {
    /// A zero `cooldown` disables the cache: every read goes to the catalog.
    pub fn new(capacity: u64, cooldown: Duration) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(capacity)
            .time_to_live(cooldown.max(Duration::from_millis(1)))
            .build();
        Self { inner, cooldown }
    }

    /// Whether `filename` was checked within the cooldown window before `now`.
    pub fn recently_checked(&self, filename: &str, now: DateTime<Utc>) -> bool {
        if self.cooldown.is_zero() {
            return false;
        }
        match self.inner.get(filename) {
            Some(checked_at) => (now - checked_at)
                .to_std()
                .map(|elapsed| elapsed < self.cooldown)
                .unwrap_or(true),
            None => false,
        }
    }

    pub fn record(&self, filename: &str, at: DateTime<Utc>) {
        if !self.cooldown.is_zero() {
            self.inner.insert(filename.to_string(), at);
        }
    }

    pub fn invalidate(&self, filename: &str) {
        self.inner.invalidate(filename);
    }
}

impl std::fmt::Debug for AccessCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessCache")
            .field("entries", &self.inner.entry_count())
            .field("cooldown", &self.cooldown)
            .finish()
    }
}

#[derive(Clone)]
pub struct ExistenceCache {
    inner: MokaCache<String, ()>,
}

impl ExistenceCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl.max(Duration::from_millis(1)))
            .build();
        Self { inner }
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.inner.contains_key(filename)
    }

    pub fn mark(&self, filename: &str) {
        self.inner.insert(filename.to_string(), ());
    }

    pub fn invalidate(&self, filename: &str) {
        self.inner.invalidate(filename);
    }
}

impl std::fmt::Debug for ExistenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExistenceCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}
