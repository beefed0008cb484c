//! LRU cache of spatial indices keyed by grid source identity.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Result;
use crate::spatial_index::SpatialIndex;
use crate::types::CacheStats;

/// Shared, capacity-bounded cache of built spatial indices.
///
/// Safe to share between threads. Index construction runs outside the lock,
/// so two callers racing on the same missing key may both build; the later
/// insert wins and both get a usable index.
pub struct SpatialIndexCache {
    cache: Mutex<LruCache<String, Arc<SpatialIndex>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl SpatialIndexCache {
    /// Create a cache holding at most `capacity` indices (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cap)),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Arc<SpatialIndex>>> {
        // A panic while holding the lock cannot leave the LRU half-updated
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up an index, counting a hit or a miss.
    pub fn get(&self, key: &str) -> Option<Arc<SpatialIndex>> {
        let found = self.lock().get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Check if a key is cached without updating LRU order or counters.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    /// Insert an index, evicting the least recently used entry when full.
    pub fn insert(&self, key: impl Into<String>, index: Arc<SpatialIndex>) {
        let key = key.into();
        let displaced = self.lock().push(key.clone(), index);
        if let Some((old_key, _)) = displaced {
            if old_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(evicted = %old_key, "Evicted spatial index");
            }
        }
    }

    /// Return the cached index for `key`, building and caching it on a miss.
    pub fn get_or_build<F>(&self, key: &str, build: F) -> Result<Arc<SpatialIndex>>
    where
        F: FnOnce() -> Result<SpatialIndex>,
    {
        if let Some(index) = self.get(key) {
            tracing::debug!(source = key, "Spatial index cache hit");
            return Ok(index);
        }

        let start = std::time::Instant::now();
        let index = Arc::new(build()?);
        tracing::debug!(
            source = key,
            cells = index.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Built spatial index"
        );

        self.insert(key, index.clone());
        Ok(index)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            capacity: self.capacity,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SpatialIndexCache {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_INDEX_CACHE_CAPACITY)
    }
}
