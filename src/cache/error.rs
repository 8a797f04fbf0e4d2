//! Cache error types

/// Cache error types
#[derive(Debug)]
pub enum CacheError {
    /// Entry is larger than the configured per-item limit
    ItemTooLarge { size_bytes: u64, max_bytes: u64 },
    /// Backend is unreachable or refused the operation
    Unavailable(String),
    /// Configuration error
    ConfigurationError(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::ItemTooLarge {
                size_bytes,
                max_bytes,
            } => write!(
                f,
                "Cache item of {} bytes exceeds limit of {} bytes",
                size_bytes, max_bytes
            ),
            CacheError::Unavailable(msg) => write!(f, "Cache unavailable: {}", msg),
            CacheError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}
