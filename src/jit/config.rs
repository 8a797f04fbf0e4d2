//! On-demand service configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_CACHE_CONTROL, DEFAULT_CACHE_STATUS_HEADER, DEFAULT_CACHE_TTL_SECONDS,
    DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, DEFAULT_ROUTE_PREFIX,
};
use crate::imaging::OutputFormat;

/// Signed-URL enforcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlSigningConfig {
    /// HMAC secret; every request must carry a valid `s`
    pub secret: String,
}

/// On-demand service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JitConfig {
    /// Path prefix in front of the content key, e.g. `/img/`
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    #[serde(default = "default_allowed_formats")]
    pub allowed_formats: Vec<OutputFormat>,
    /// Format used when the request names none; `None` keeps the original
    #[serde(default)]
    pub default_format: Option<OutputFormat>,
    #[serde(default = "default_quality")]
    pub default_quality: u8,
    #[serde(default = "default_cache_control")]
    pub cache_control: String,
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_cache_status_header")]
    pub cache_status_header: String,
    #[serde(default)]
    pub security: Option<UrlSigningConfig>,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            route_prefix: default_route_prefix(),
            max_width: default_max_width(),
            max_height: default_max_height(),
            allowed_formats: default_allowed_formats(),
            default_format: None,
            default_quality: default_quality(),
            cache_control: default_cache_control(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            cache_status_header: default_cache_status_header(),
            security: None,
        }
    }
}

fn default_route_prefix() -> String {
    DEFAULT_ROUTE_PREFIX.to_string()
}

fn default_max_width() -> u32 {
    DEFAULT_MAX_WIDTH
}

fn default_max_height() -> u32 {
    DEFAULT_MAX_HEIGHT
}

fn default_allowed_formats() -> Vec<OutputFormat> {
    OutputFormat::ALL.to_vec()
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

fn default_cache_control() -> String {
    DEFAULT_CACHE_CONTROL.to_string()
}

fn default_cache_ttl_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECONDS
}

fn default_cache_status_header() -> String {
    DEFAULT_CACHE_STATUS_HEADER.to_string()
}

impl JitConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Secret to verify against, when signing is enforced
    pub fn secret(&self) -> Option<&str> {
        self.security.as_ref().map(|s| s.secret.as_str())
    }

    /// Validate on-demand service configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.route_prefix.starts_with('/') || !self.route_prefix.ends_with('/') {
            return Err(format!(
                "route_prefix '{}' must start and end with '/'",
                self.route_prefix
            ));
        }
        if self.max_width == 0 {
            return Err("max_width must be greater than 0".to_string());
        }
        if self.max_height == 0 {
            return Err("max_height must be greater than 0".to_string());
        }
        if !(1..=100).contains(&self.default_quality) {
            return Err(format!(
                "default_quality must be between 1 and 100, got {}",
                self.default_quality
            ));
        }
        if self.allowed_formats.is_empty() {
            return Err("allowed_formats cannot be empty".to_string());
        }
        if let Some(format) = self.default_format {
            if !self.allowed_formats.contains(&format) {
                return Err(format!(
                    "default_format '{}' is not in allowed_formats",
                    format
                ));
            }
        }
        if let Some(security) = &self.security {
            if security.secret.is_empty() {
                return Err("security.secret cannot be empty".to_string());
            }
        }
        Ok(())
    }
}
