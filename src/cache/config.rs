//! Cache configuration types

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_CACHE_SIZE_MB, DEFAULT_MAX_ITEM_SIZE_MB};

/// Memory cache configuration
///
/// Entry lifetimes are not configured here: every `set` carries its own TTL,
/// taken from the service's `cache_ttl_seconds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    #[serde(default = "default_max_item_size_mb")]
    pub max_item_size_mb: u64,
    #[serde(default = "default_max_cache_size_mb")]
    pub max_cache_size_mb: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_item_size_mb: default_max_item_size_mb(),
            max_cache_size_mb: default_max_cache_size_mb(),
        }
    }
}

fn default_max_item_size_mb() -> u64 {
    DEFAULT_MAX_ITEM_SIZE_MB
}

fn default_max_cache_size_mb() -> u64 {
    DEFAULT_MAX_CACHE_SIZE_MB
}

impl MemoryCacheConfig {
    /// Convert max_item_size_mb to bytes
    pub fn max_item_size_bytes(&self) -> u64 {
        self.max_item_size_mb * 1024 * 1024
    }

    /// Convert max_cache_size_mb to bytes
    pub fn max_cache_size_bytes(&self) -> u64 {
        self.max_cache_size_mb * 1024 * 1024
    }

    /// Validate memory cache configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_cache_size_mb == 0 {
            return Err("max_cache_size_mb must be greater than 0".to_string());
        }
        if self.max_item_size_mb > self.max_cache_size_mb {
            return Err(format!(
                "max_item_size_mb ({}) cannot be greater than max_cache_size_mb ({})",
                self.max_item_size_mb, self.max_cache_size_mb
            ));
        }
        Ok(())
    }
}
