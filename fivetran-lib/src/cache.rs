//! In-memory response cache with a fixed time-to-live per entry.
//!
//! Concurrent misses for the same key are collapsed: the first caller runs
//! the computation while the others wait on a per-key lock, then pick up the
//! freshly stored value. Failed computations store nothing, so the next
//! waiter in line runs the computation itself.
//!
//! Nothing is evicted in the background. Expired entries are dropped the
//! next time somebody looks them up.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::ratelimit::deadline_after;
use crate::{ErrorKind, Result};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Hit and miss counters of a [`ResponseCache`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache, including callers that waited for
    /// another caller's computation
    pub hits: u64,
    /// Lookups that ran the computation
    pub misses: u64,
    /// Stored entries, including expired ones not collected yet
    pub entries: usize,
}

/// Keyed TTL cache with single-flight computation of missing values
#[derive(Debug)]
pub struct ResponseCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, CacheEntry<V>>,
    /// One lock per key with a computation pending. Created on the first
    /// miss and removed by the last caller holding it.
    guards: DashMap<K, Arc<Mutex<()>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> Default for ResponseCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            guards: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<K, V> ResponseCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value stored under `key` if it has not expired.
    ///
    /// An expired entry is removed on the way.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key)
            && entry.is_live(now)
        {
            return Some(entry.value.clone());
        }

        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: deadline_after(Instant::now(), ttl),
        };
        self.entries.insert(key, entry);
    }

    /// Remove the entry for `key`. Returns `true` if there was one.
    ///
    /// A computation pending for `key` is not affected and will store its
    /// result when done.
    pub fn remove(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not collected yet
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current hit and miss counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    /// Number of keys with a computation pending or queued
    #[cfg(test)]
    pub(crate) fn pending_keys(&self) -> usize {
        self.guards.len()
    }

    /// Return the live value for `key`, or run `compute` and cache its
    /// result for `ttl`.
    ///
    /// At most one `compute` runs per key at any time. Callers arriving while
    /// it runs wait for it and return the stored value without computing.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Cancelled`] if `cancel` fires while waiting for
    /// another caller's computation, and any error returned by `compute`.
    /// Errors are never cached.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: K,
        ttl: Duration,
        cancel: &CancellationToken,
        compute: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let guard = KeyGuard::new(self, key);
        let _exclusive = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ErrorKind::Cancelled),
            exclusive = guard.lock.lock() => exclusive,
        };

        // Somebody else may have stored the value while we were waiting
        if let Some(value) = self.get(&guard.key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = compute().await?;
        self.insert(guard.key.clone(), value.clone(), ttl);
        Ok(value)
    }
}

/// A caller's handle on the per-key lock.
///
/// On drop the lock is removed from the map if no other caller holds it.
/// The check and the removal happen under the map's shard lock, so a caller
/// cannot pick up a lock that is being removed. A caller arriving right
/// after the removal creates a fresh one.
struct KeyGuard<'a, K, V>
where
    K: Eq + Hash,
{
    cache: &'a ResponseCache<K, V>,
    key: K,
    lock: Arc<Mutex<()>>,
}

impl<'a, K, V> KeyGuard<'a, K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(cache: &'a ResponseCache<K, V>, key: K) -> Self {
        let lock = Arc::clone(&cache.guards.entry(key.clone()).or_default());
        Self { cache, key, lock }
    }
}

impl<K, V> Drop for KeyGuard<'_, K, V>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        // one reference in the map, one held by us
        self.cache.guards.remove_if(&self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}
