use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Probed facts about an original image
///
/// Produced once per original by [`TransformEngine::probe`](super::TransformEngine::probe)
/// and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// Container format as detected (`jpeg`, `png`, `webp`, `gif`, ...)
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    /// Bits per channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u8>,
    /// Dots per inch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_alpha: Option<bool>,
    /// EXIF orientation (1-8)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u16>,
    /// Raw EXIF fields, tag name to display value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exif: Option<BTreeMap<String, String>>,
}

impl ImageMetadata {
    /// Metadata carrying only the mandatory fields
    pub fn basic(width: u32, height: u32, format: impl Into<String>) -> Self {
        Self {
            width,
            height,
            format: format.into(),
            ..Default::default()
        }
    }
}
