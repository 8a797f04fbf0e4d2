//! Memory cache implementation
//!
//! - `MemoryCache`: bounded, per-entry TTL cache backed by moka
//! - `NullCache`: no-op implementation for disabled caching

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::MemoryCacheConfig;
use super::error::CacheError;
use super::stats::{CacheStats, CacheStatsTracker};
use super::traits::VariantCache;

/// Stored value: the payload plus the lifetime it was inserted with
#[derive(Debug, Clone)]
struct CachedVariant {
    data: Bytes,
    ttl: Duration,
}

/// Expiry policy reading the TTL carried by each entry
struct PerEntryTtl;

impl moka::Expiry<String, CachedVariant> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedVariant,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedVariant,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// MemoryCache wraps moka for the VariantCache trait
pub struct MemoryCache {
    cache: moka::future::Cache<String, CachedVariant>,
    stats: Arc<CacheStatsTracker>,
    max_item_size_bytes: u64,
    max_cache_size_bytes: u64,
}

impl MemoryCache {
    /// Create a new MemoryCache from configuration
    pub fn new(config: &MemoryCacheConfig) -> Self {
        // Shared with the eviction listener
        let stats = Arc::new(CacheStatsTracker::new());
        let stats_clone = stats.clone();

        let cache = moka::future::Cache::builder()
            .max_capacity(config.max_cache_size_bytes())
            .expire_after(PerEntryTtl)
            .weigher(|_key: &String, entry: &CachedVariant| {
                u32::try_from(entry.data.len()).unwrap_or(u32::MAX)
            })
            .eviction_listener(move |_key, _value, cause| {
                use moka::notification::RemovalCause;
                // Explicit invalidations and overwrites are not evictions
                if matches!(cause, RemovalCause::Size | RemovalCause::Expired) {
                    stats_clone.increment_evictions();
                }
            })
            .build();

        Self {
            cache,
            stats,
            max_item_size_bytes: config.max_item_size_bytes(),
            max_cache_size_bytes: config.max_cache_size_bytes(),
        }
    }

    /// Remove an entry
    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Get current weighted size in bytes
    pub fn weighted_size(&self) -> u64 {
        self.cache.weighted_size()
    }

    /// Get current entry count (approximate due to eventual consistency)
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    fn get_stats(&self) -> CacheStats {
        self.stats.snapshot(
            self.cache.weighted_size(),
            self.cache.entry_count(),
            self.max_cache_size_bytes,
        )
    }
}

#[async_trait]
impl VariantCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        match self.cache.get(key).await {
            Some(entry) => {
                self.stats.increment_hits();
                Ok(Some(entry.data))
            }
            None => {
                self.stats.increment_misses();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, data: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let size_bytes = data.len() as u64;
        if size_bytes > self.max_item_size_bytes {
            return Err(CacheError::ItemTooLarge {
                size_bytes,
                max_bytes: self.max_item_size_bytes,
            });
        }

        self.cache
            .insert(key.to_string(), CachedVariant { data, ttl })
            .await;
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(self.get_stats())
    }

    async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

/// NullCache is a no-op cache implementation used when caching is disabled
pub struct NullCache;

#[async_trait]
impl VariantCache for NullCache {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _data: Bytes, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(CacheStats::default())
    }
}
