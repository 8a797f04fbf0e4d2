//! Output formats and crop strategies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ImageError;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Avif,
}

impl OutputFormat {
    /// Every format the encoders can produce
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::WebP,
        OutputFormat::Avif,
        OutputFormat::Jpeg,
        OutputFormat::Png,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
        }
    }

    /// Map a content type back to a format, if it is one we encode
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            "image/avif" => Some(Self::Avif),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            _ => Err(ImageError::invalid_param(
                "format",
                format!("unknown format: {}", s),
            )),
        }
    }
}

/// Anchor used when a resize has to crop to fill the target box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropStrategy {
    #[default]
    Center,
    Top,
    Right,
    Bottom,
    Left,
    /// Region with the most detail; anchored at the center by [`RasterEngine`](super::RasterEngine)
    Entropy,
    /// Region most likely to draw the eye; anchored at the center by [`RasterEngine`](super::RasterEngine)
    Attention,
}

impl CropStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Entropy => "entropy",
            Self::Attention => "attention",
        }
    }
}

impl FromStr for CropStrategy {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "center" | "centre" => Ok(CropStrategy::Center),
            "top" => Ok(CropStrategy::Top),
            "right" => Ok(CropStrategy::Right),
            "bottom" => Ok(CropStrategy::Bottom),
            "left" => Ok(CropStrategy::Left),
            "entropy" => Ok(CropStrategy::Entropy),
            "attention" => Ok(CropStrategy::Attention),
            _ => Err(ImageError::invalid_param(
                "crop",
                format!("unknown crop strategy: {}", s),
            )),
        }
    }
}
