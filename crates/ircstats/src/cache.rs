// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded, time-expiring LRU cache of resolved users.
//!
//! Two independent limits apply to every entry:
//!
//! - **Capacity**: inserting past `capacity` distinct keys evicts the least
//!   recently used entry.
//! - **TTL**: an entry older than `ttl` is a miss, however recently it was
//!   read. Stale entries are dropped when found.
//!
//! Recency is updated by reads; age is only reset by re-insertion.

use crate::model::User;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of cached users.
pub const DEFAULT_CAPACITY: usize = 50;

/// Default time-to-live of a cached user.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

struct Entry {
    user: Arc<User>,
    inserted: Instant,
}

/// Cache hit/miss statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
}

/// Concurrent user cache keyed by lowercased nickname.
pub struct UserCache {
    inner: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
    stats: Mutex<CacheStats>,
}

impl UserCache {
    /// Create a cache holding at most `capacity` users for at most `ttl` each.
    ///
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Look up a user, marking it most recently used.
    pub fn get(&self, key: &str) -> Option<Arc<User>> {
        self.get_at(key, Instant::now())
    }

    /// Insert or replace a user with a fresh TTL.
    pub fn insert(&self, key: &str, user: Arc<User>) {
        self.insert_at(key, user, Instant::now());
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<Arc<User>> {
        let mut cache = self.inner.lock();

        let lookup = cache.get(key).map(|entry| {
            let alive = now.saturating_duration_since(entry.inserted) <= self.ttl;
            (alive, Arc::clone(&entry.user))
        });

        let fresh = match lookup {
            Some((true, user)) => Some(user),
            Some((false, _)) => {
                cache.pop(key);
                self.stats.lock().expired += 1;
                None
            }
            None => None,
        };
        drop(cache);

        let mut stats = self.stats.lock();
        match fresh {
            Some(_) => stats.hits += 1,
            None => stats.misses += 1,
        }
        fresh
    }

    pub(crate) fn insert_at(&self, key: &str, user: Arc<User>, now: Instant) {
        self.inner.lock().put(
            key.to_string(),
            Entry {
                user,
                inserted: now,
            },
        );
    }

    /// Number of entries currently held, including ones that may have expired.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }
}

impl Default for UserCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}
