//! Transform capability
//!
//! The core never touches pixels itself; it calls through this trait.
//! Implementations must be deterministic: identical input bytes and
//! identical parameters must yield byte-identical output, otherwise cached
//! variants would diverge from freshly generated ones.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::ImageError;
use super::format::{CropStrategy, OutputFormat};
use super::metadata::ImageMetadata;

/// An original image handed to the engine
#[derive(Debug, Clone)]
pub struct EngineInput {
    pub filename: String,
    pub bytes: Bytes,
    pub content_type: String,
}

impl EngineInput {
    pub fn new(
        filename: impl Into<String>,
        bytes: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }
}

/// Parameters for a single transformation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<OutputFormat>,
    pub quality: Option<u8>,
    pub crop: Option<CropStrategy>,
}

/// Output of a transformation
///
/// Dimensions are the ones actually produced, which may differ from the
/// requested ones (aspect ratio is preserved unless cropping).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedImage {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

/// Transform engine trait (probe + transform)
#[async_trait]
pub trait TransformEngine: Send + Sync {
    /// Extract metadata without producing a variant
    async fn probe(&self, input: &EngineInput) -> Result<ImageMetadata, ImageError>;

    /// Produce a variant of `input`
    async fn transform(
        &self,
        input: &EngineInput,
        request: &TransformRequest,
    ) -> Result<TransformedImage, ImageError>;
}
