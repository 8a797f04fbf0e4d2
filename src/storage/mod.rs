//! Storage capability: persist originals and generated variants
//!
//! - [`VariantStorage`]: the trait the batch orchestrator calls through
//! - [`LocalStorage`]: files under a base directory, served from a base URL
//! - [`MemoryStorage`]: in-process map for dry runs and tests

mod local;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::security::SecurityError;

pub use local::{LocalStorage, LocalStorageConfig};
pub use memory::{MemoryStorage, StoredEntry};

/// Facts recorded alongside a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

/// Result of a successful put
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub url: String,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(#[from] SecurityError),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Object storage for originals and variants
#[async_trait]
pub trait VariantStorage: Send + Sync {
    /// Store `bytes` under `key`, overwriting any previous object
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        meta: &ObjectMeta,
    ) -> Result<StoredObject, StorageError>;
}

/// Join a base URL and a key with exactly one slash
pub fn public_url(base_url: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}
