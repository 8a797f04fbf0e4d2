//! Source capability: resolve a content key to original bytes
//!
//! - [`ImageSource`]: the trait the on-demand service calls through
//! - [`FsSource`]: originals read from a directory on local disk

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::DEFAULT_SOURCE_DIR;
use crate::security::join_key;

/// Original bytes plus their content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub bytes: Bytes,
    pub content_type: String,
}

impl SourceImage {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error reading source: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source backend unavailable: {0}")]
    Unavailable(String),
}

/// Resolves content keys to originals
///
/// `Ok(None)` means "not found"; `Err` is reserved for backend failures.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn resolve(&self, key: &str) -> Result<Option<SourceImage>, SourceError>;
}

/// Filesystem source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
        }
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE_DIR)
}

/// Reads originals from `root_dir/<key>`
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.root_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ImageSource for FsSource {
    async fn resolve(&self, key: &str) -> Result<Option<SourceImage>, SourceError> {
        let path = match join_key(&self.root, key) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Rejected source key");
                return Ok(None);
            }
        };

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(SourceImage::new(
                data,
                content_type_for_path(&path),
            ))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SourceError::Io(err)),
        }
    }
}

/// Content type from a file extension
pub fn content_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
