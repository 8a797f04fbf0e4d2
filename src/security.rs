//! Key validation for filesystem-backed capabilities
//!
//! Content keys and storage keys arrive from request paths and upload
//! filenames. Before either touches the filesystem it is checked for:
//! - path traversal (`..` segments, also percent-encoded)
//! - null bytes (path truncation)
//! - absolute paths, drive prefixes and backslashes

use std::path::{Component, Path, PathBuf};

/// Key validation error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// Path traversal attempt detected
    PathTraversal { path: String },
    /// Key is empty or absolute
    InvalidKey { key: String },
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityError::PathTraversal { path } => {
                write!(f, "Path traversal attempt detected: {}", path)
            }
            SecurityError::InvalidKey { key } => write!(f, "Invalid key: {:?}", key),
        }
    }
}

impl std::error::Error for SecurityError {}

/// Reject keys containing traversal sequences or null bytes
pub fn check_path_traversal(path: &str) -> Result<(), SecurityError> {
    let path_lower = path.to_lowercase();

    if path_lower.contains("../")
        || path_lower.contains("..\\")
        || path_lower.ends_with("..")
        || path_lower.contains("%2e%2e")
        || path.contains('\\')
        || path.contains('\0')
    {
        return Err(SecurityError::PathTraversal {
            path: path.to_string(),
        });
    }

    Ok(())
}

/// Join a relative `key` onto `root`, refusing anything that could escape it
pub fn join_key(root: &Path, key: &str) -> Result<PathBuf, SecurityError> {
    check_path_traversal(key)?;

    let relative = Path::new(key);
    let mut joined = root.to_path_buf();
    let mut segments = 0usize;

    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                joined.push(segment);
                segments += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(SecurityError::PathTraversal {
                    path: key.to_string(),
                })
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SecurityError::InvalidKey {
                    key: key.to_string(),
                })
            }
        }
    }

    if segments == 0 {
        return Err(SecurityError::InvalidKey {
            key: key.to_string(),
        });
    }

    Ok(joined)
}
