// Cache module
//
// Variant bytes are cached under a key derived from the content key and the
// resolved transform parameters (see `key`). The service talks to the cache
// only through the `VariantCache` trait and is always handed a concrete
// implementation by its caller.

pub mod config;
pub mod error;
pub mod key;
pub mod memory;
pub mod stats;
pub mod traits;

pub use config::MemoryCacheConfig;
pub use error::CacheError;
pub use key::{derive_cache_key, TransformParams, KEY_SEPARATOR};
pub use memory::{MemoryCache, NullCache};
pub use stats::CacheStats;
pub use traits::VariantCache;
