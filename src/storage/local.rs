//! Filesystem storage backend

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{public_url, ObjectMeta, StorageError, StoredObject, VariantStorage};
use crate::constants::{DEFAULT_STORAGE_BASE_URL, DEFAULT_STORAGE_DIR};
use crate::security::join_key;

/// Local storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            base_url: default_base_url(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_DIR)
}

fn default_base_url() -> String {
    DEFAULT_STORAGE_BASE_URL.to_string()
}

impl LocalStorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.base_dir.as_os_str().is_empty() {
            return Err("storage base_dir cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Writes objects to `base_dir/<key>`; URLs are `base_url/<key>`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
    base_url: String,
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &LocalStorageConfig) -> Self {
        Self::new(config.base_dir.clone(), config.base_url.clone())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[async_trait]
impl VariantStorage for LocalStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        meta: &ObjectMeta,
    ) -> Result<StoredObject, StorageError> {
        let path = join_key(&self.base_dir, key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to a uniquely named sibling, then rename into place
        let temp_path = temp_path_for(&path);
        let written = match tokio::fs::write(&temp_path, &bytes).await {
            Ok(()) => tokio::fs::rename(&temp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(
            key = %key,
            content_type = %content_type,
            bytes = bytes.len(),
            width = meta.width,
            height = meta.height,
            "Stored object"
        );

        Ok(StoredObject {
            url: public_url(&self.base_url, key),
        })
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `<path>.<pid>.<n>.tmp`, unique across concurrent puts in this process
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    PathBuf::from(name)
}
