//! In-process storage backend

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{public_url, ObjectMeta, StorageError, StoredObject, VariantStorage};

/// One object held by [`MemoryStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub bytes: Bytes,
    pub content_type: String,
    pub meta: ObjectMeta,
}

/// Keeps every object in memory, keyed by storage key
#[derive(Debug)]
pub struct MemoryStorage {
    base_url: String,
    objects: RwLock<BTreeMap<String, StoredEntry>>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredEntry> {
        self.objects.read().await.get(key).cloned()
    }

    /// Stored keys in lexical order
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("/memory")
    }
}

#[async_trait]
impl VariantStorage for MemoryStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        meta: &ObjectMeta,
    ) -> Result<StoredObject, StorageError> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredEntry {
                bytes,
                content_type: content_type.to_string(),
                meta: meta.clone(),
            },
        );
        Ok(StoredObject {
            url: public_url(&self.base_url, key),
        })
    }
}
