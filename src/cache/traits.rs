//! Cache capability trait
//!
//! The on-demand service only needs presence/absence and a byte payload;
//! it never inspects entries beyond that.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use super::error::CacheError;
use super::stats::CacheStats;

/// Byte cache for transformed variants
///
/// Implementations must be safe for concurrent `get`/`set` from any number
/// of tasks.
#[async_trait]
pub trait VariantCache: Send + Sync {
    /// Get cached bytes for `key`
    /// Returns None if the key is not found or the entry has expired
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Store `data` under `key` for `ttl`
    /// Overwrites any existing entry
    async fn set(&self, key: &str, data: Bytes, ttl: Duration) -> Result<(), CacheError>;

    /// Get cache statistics
    async fn stats(&self) -> Result<CacheStats, CacheError>;

    /// Run pending async tasks (for caches that use async backends like moka)
    /// Default implementation is a no-op
    async fn run_pending_tasks(&self) {}
}
