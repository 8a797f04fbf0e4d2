// Constants module - centralized default values for configuration
//
// Every default that a config struct or the request handler falls back to
// lives here so the YAML defaults and the code defaults cannot drift.

// =============================================================================
// On-demand service defaults
// =============================================================================

/// Default route prefix the content key is extracted from
pub const DEFAULT_ROUTE_PREFIX: &str = "/img/";

/// Default maximum requested width in pixels
pub const DEFAULT_MAX_WIDTH: u32 = 4096;

/// Default maximum requested height in pixels
pub const DEFAULT_MAX_HEIGHT: u32 = 4096;

/// Default output quality (1-100)
pub const DEFAULT_QUALITY: u8 = 80;

/// Default Cache-Control header value for served variants
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Default response header carrying HIT/MISS
pub const DEFAULT_CACHE_STATUS_HEADER: &str = "X-Pixvariant-Cache";

/// Default time-to-live for cached variants (1 hour)
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

// =============================================================================
// Cache defaults
// =============================================================================

/// Default maximum cache item size in megabytes
pub const DEFAULT_MAX_ITEM_SIZE_MB: u64 = 10;

/// Default maximum memory cache size in megabytes (256 MB)
pub const DEFAULT_MAX_CACHE_SIZE_MB: u64 = 256;

// =============================================================================
// Image processing defaults
// =============================================================================

/// Maximum decoded pixel count accepted from an original (100 megapixels)
pub const DEFAULT_MAX_SOURCE_PIXELS: u64 = 100_000_000;

// =============================================================================
// Storage defaults
// =============================================================================

/// Default directory the local storage backend writes into
pub const DEFAULT_STORAGE_DIR: &str = "./public/uploads";

/// Default public URL prefix for stored objects
pub const DEFAULT_STORAGE_BASE_URL: &str = "/uploads";

/// Default directory originals are read from
pub const DEFAULT_SOURCE_DIR: &str = "./images";

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log level filter
pub const DEFAULT_LOG_LEVEL: &str = "info";
