//! Route resolution cache.
//!
//! Memoizes matcher results keyed by stage, domain, method and path. Misses are cached too (as
//! `None` for serve lookups, an empty chain for hooks). Entries are only ever the output of the
//! pure matcher over immutable trees, so any of them can be dropped at any time.
//!
//! ## Expiry
//!
//! Each entry carries its own deadline computed from the TTL at insertion. A TTL of `0` means
//! entries never expire while the router runs. Expired entries are dropped lazily on lookup, or
//! in bulk with [`RouteCache::purge_expired`].
//!
//! ## Thread Safety
//!
//! Backed by [`DashMap`], so concurrent lookups and write-on-miss need no external lock. Two
//! requests missing the same key at once both compute and both insert; the values are equal and
//! the last write wins.

use dashmap::DashMap;
use http::Method;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::hooks::HookStage;

/// Cache key: one resolution query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// `None` for serve resolution, the stage for hook chains
    pub stage: Option<HookStage>,
    /// Normalized request domain
    pub domain: String,
    /// Request method
    pub method: Method,
    /// Request path
    pub path: String,
}

impl CacheKey {
    /// Key for a serve lookup.
    #[must_use]
    pub fn serve(domain: &str, method: &Method, path: &str) -> Self {
        Self {
            stage: None,
            domain: domain.to_string(),
            method: method.clone(),
            path: path.to_string(),
        }
    }

    /// Key for a hook-chain lookup.
    #[must_use]
    pub fn hook(stage: HookStage, domain: &str, method: &Method, path: &str) -> Self {
        Self {
            stage: Some(stage),
            ..Self::serve(domain, method, path)
        }
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Concurrent TTL cache for resolution results.
pub struct RouteCache<V> {
    entries: DashMap<CacheKey, CacheEntry<V>>,
    ttl: Option<Duration>,
    enabled: bool,
}

impl<V: Clone> RouteCache<V> {
    /// Create a cache. `ttl_ms == 0` keeps entries forever; `enabled == false` makes every
    /// lookup miss and every insert a no-op.
    #[must_use]
    pub fn new(ttl_ms: u64, enabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: (ttl_ms > 0).then(|| Duration::from_millis(ttl_ms)),
            enabled,
        }
    }

    /// Look up an unexpired entry. An expired entry is removed on the way out.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        if !self.enabled {
            return None;
        }
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        // the read guard must be released before taking the shard write lock
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    /// Store a value, replacing any previous entry for the key.
    pub fn insert(&self, key: CacheKey, value: V) {
        if !self.enabled {
            return;
        }
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        self.entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Return the cached value, or compute, store and return it.
    ///
    /// `compute` runs without any shard lock held.
    pub fn get_or_insert_with(&self, key: CacheKey, compute: impl FnOnce() -> V) -> V {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed = removed, remaining = self.entries.len(), "Route cache purged");
        }
        removed
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included until they are purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured TTL, `None` when entries never expire.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Whether lookups are cached at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
