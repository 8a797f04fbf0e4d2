//! Image model and the Transform capability
//!
//! - [`TransformEngine`]: the abstract probe/transform capability the service
//!   and the batch orchestrator call through
//! - [`RasterEngine`]: the bundled implementation (decode, resize without
//!   enlargement, optional anchored crop, encode to JPEG/PNG/WebP/AVIF)
//! - shared value types: [`ImageMetadata`], [`OutputFormat`], [`CropStrategy`]

pub mod encoder;
pub mod engine;
pub mod error;
pub mod format;
pub mod metadata;
pub mod processor;

pub use encoder::{EncodedImage, EncoderFactory, EncoderQuality, ImageEncoder};
pub use engine::{EngineInput, TransformEngine, TransformRequest, TransformedImage};
pub use error::ImageError;
pub use format::{CropStrategy, OutputFormat};
pub use metadata::ImageMetadata;
pub use processor::{plan_resize, RasterEngine, RasterLimits, ResizePlan};
