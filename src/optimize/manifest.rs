use serde::{Deserialize, Serialize};

use crate::imaging::{CropStrategy, OutputFormat};

/// Key prefix for stored originals
pub const ORIGINAL_PREFIX: &str = "original/";

/// Key prefix for stored variants
pub const VARIANT_PREFIX: &str = "variants/";

/// Facts about the original recorded in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalInfo {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub bytes: u64,
}

/// One stored variant, described by what the engine actually produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub key: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropStrategy>,
}

/// Result of one optimize run; variants keep the policy's order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub original: OriginalInfo,
    pub variants: Vec<Variant>,
}

impl Manifest {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// `original/<filename>`
pub fn original_key(filename: &str) -> String {
    format!("{}{}", ORIGINAL_PREFIX, filename)
}

/// `variants/<base>_<width>w.<format>`
pub fn variant_key(filename: &str, width: u32, format: OutputFormat) -> String {
    format!(
        "{}{}_{}w.{}",
        VARIANT_PREFIX,
        base_filename(filename),
        width,
        format.as_str()
    )
}

/// Filename without its last extension (`cat.photo.jpg` -> `cat.photo`)
pub fn base_filename(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx + 1 < filename.len() => &filename[..idx],
        _ => filename,
    }
}
