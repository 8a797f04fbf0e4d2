//! Raster transform engine
//!
//! Handles the actual image work: probe → decode → resize/crop → encode.
//! CPU-bound steps run on the blocking thread pool.

use async_trait::async_trait;
use bytes::Bytes;
use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::num::NonZeroU32;

use super::encoder::{EncoderFactory, EncoderQuality};
use super::engine::{EngineInput, TransformEngine, TransformRequest, TransformedImage};
use super::error::ImageError;
use super::format::{CropStrategy, OutputFormat};
use super::metadata::ImageMetadata;
use crate::constants::{DEFAULT_MAX_SOURCE_PIXELS, DEFAULT_QUALITY};

/// Safety limits applied before any full decode
#[derive(Debug, Clone, Copy)]
pub struct RasterLimits {
    /// Maximum allowed source width * height
    pub max_source_pixels: u64,
}

impl Default for RasterLimits {
    fn default() -> Self {
        Self {
            max_source_pixels: DEFAULT_MAX_SOURCE_PIXELS,
        }
    }
}

/// [`TransformEngine`] built on the `image` and `fast_image_resize` crates
#[derive(Debug, Clone, Default)]
pub struct RasterEngine {
    limits: RasterLimits,
}

impl RasterEngine {
    pub fn new(limits: RasterLimits) -> Self {
        Self { limits }
    }
}

#[async_trait]
impl TransformEngine for RasterEngine {
    async fn probe(&self, input: &EngineInput) -> Result<ImageMetadata, ImageError> {
        let data = input.bytes.clone();
        let limits = self.limits;
        run_blocking(move || probe_image(&data, limits)).await
    }

    async fn transform(
        &self,
        input: &EngineInput,
        request: &TransformRequest,
    ) -> Result<TransformedImage, ImageError> {
        let data = input.bytes.clone();
        let request = request.clone();
        let limits = self.limits;
        run_blocking(move || transform_image(&data, &request, limits)).await
    }
}

async fn run_blocking<T, F>(job: F) -> Result<T, ImageError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ImageError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ImageError::TaskFailed {
            message: e.to_string(),
        })?
}

/// Read dimensions, color layout and EXIF facts from encoded bytes
pub fn probe_image(data: &[u8], limits: RasterLimits) -> Result<ImageMetadata, ImageError> {
    let format = guess_format(data)?;
    let (width, height) = read_dimensions(data)?;
    check_limits(width, height, limits)?;

    let img = decode_image(data)?;
    let color = img.color();
    let channels = color.channel_count();
    let depth = (color.bytes_per_pixel() / channels.max(1)) * 8;

    let exif = read_exif(data);
    let orientation = exif
        .as_ref()
        .and_then(|e| e.get_field(exif::Tag::Orientation, exif::In::PRIMARY))
        .and_then(|f| f.value.get_uint(0))
        .and_then(|v| u16::try_from(v).ok());
    let density = exif.as_ref().and_then(density_from_exif);
    let exif_fields = exif.as_ref().map(|e| {
        e.fields()
            .filter(|f| f.ifd_num == exif::In::PRIMARY)
            .map(|f| (f.tag.to_string(), f.display_value().to_string()))
            .collect::<BTreeMap<_, _>>()
    });

    Ok(ImageMetadata {
        width,
        height,
        format: format_name(format),
        space: Some(if color.has_color() { "srgb" } else { "b-w" }.to_string()),
        channels: Some(channels),
        depth: Some(depth),
        density,
        has_alpha: Some(color.has_alpha()),
        orientation,
        exif: exif_fields.filter(|fields| !fields.is_empty()),
    })
}

/// Decode, resize and re-encode
pub fn transform_image(
    data: &[u8],
    request: &TransformRequest,
    limits: RasterLimits,
) -> Result<TransformedImage, ImageError> {
    let (src_width, src_height) = read_dimensions(data)?;
    check_limits(src_width, src_height, limits)?;

    let img = decode_image(data)?;

    let plan = plan_resize(
        img.width(),
        img.height(),
        request.width,
        request.height,
        request.crop,
    );

    let resized = if plan.resize != (img.width(), img.height()) {
        resize_image(&img, plan.resize.0, plan.resize.1)?
    } else {
        img
    };

    let output = match plan.crop {
        Some((x, y, w, h)) => resized.crop_imm(x, y, w, h),
        None => resized,
    };

    let format = request.format.unwrap_or(OutputFormat::Jpeg);
    let quality = EncoderQuality::with_quality(request.quality.unwrap_or(DEFAULT_QUALITY));
    let (width, height) = (output.width(), output.height());

    let encoded = EncoderFactory::create(format).encode(
        &output.to_rgba8().into_raw(),
        width,
        height,
        quality,
    )?;

    Ok(TransformedImage {
        bytes: Bytes::from(encoded.data),
        width,
        height,
        format: encoded.format,
    })
}

/// Resize target plus an optional crop window applied afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub resize: (u32, u32),
    /// (x, y, width, height) within the resized image
    pub crop: Option<(u32, u32, u32, u32)>,
}

/// Work out output geometry. Never enlarges.
///
/// - no width/height: keep source size
/// - crop strategy with both sides: scale to cover the box, then crop at the anchor
/// - otherwise: scale to fit inside the box, preserving aspect ratio
pub fn plan_resize(
    src_width: u32,
    src_height: u32,
    width: Option<u32>,
    height: Option<u32>,
    crop: Option<CropStrategy>,
) -> ResizePlan {
    let unchanged = ResizePlan {
        resize: (src_width, src_height),
        crop: None,
    };
    if src_width == 0 || src_height == 0 {
        return unchanged;
    }

    let sw = src_width as f64;
    let sh = src_height as f64;

    match (width, height, crop) {
        (None, None, _) => unchanged,
        (Some(tw), Some(th), Some(strategy)) => {
            let tw = tw.min(src_width).max(1);
            let th = th.min(src_height).max(1);
            let scale = (tw as f64 / sw).max(th as f64 / sh).min(1.0);
            let rw = ((sw * scale).round() as u32).max(tw);
            let rh = ((sh * scale).round() as u32).max(th);
            let (x, y) = crop_offset(strategy, rw, rh, tw, th);
            ResizePlan {
                resize: (rw, rh),
                crop: if (rw, rh) == (tw, th) {
                    None
                } else {
                    Some((x, y, tw, th))
                },
            }
        }
        (tw, th, _) => {
            let scale_w = tw.map(|w| w as f64 / sw).unwrap_or(f64::INFINITY);
            let scale_h = th.map(|h| h as f64 / sh).unwrap_or(f64::INFINITY);
            let scale = scale_w.min(scale_h).min(1.0);
            if scale >= 1.0 {
                return unchanged;
            }
            ResizePlan {
                resize: (
                    ((sw * scale).round() as u32).max(1),
                    ((sh * scale).round() as u32).max(1),
                ),
                crop: None,
            }
        }
    }
}

fn crop_offset(strategy: CropStrategy, rw: u32, rh: u32, tw: u32, th: u32) -> (u32, u32) {
    let center_x = (rw - tw) / 2;
    let center_y = (rh - th) / 2;
    match strategy {
        CropStrategy::Top => (center_x, 0),
        CropStrategy::Bottom => (center_x, rh - th),
        CropStrategy::Left => (0, center_y),
        CropStrategy::Right => (rw - tw, center_y),
        CropStrategy::Center | CropStrategy::Entropy | CropStrategy::Attention => {
            (center_x, center_y)
        }
    }
}

fn check_limits(width: u32, height: u32, limits: RasterLimits) -> Result<(), ImageError> {
    let pixels = width as u64 * height as u64;
    if pixels > limits.max_source_pixels {
        return Err(ImageError::image_bomb(
            width,
            height,
            limits.max_source_pixels,
        ));
    }
    Ok(())
}

fn guess_format(data: &[u8]) -> Result<ImageFormat, ImageError> {
    image::guess_format(data).map_err(|_| ImageError::unsupported_format("unknown"))
}

fn read_dimensions(data: &[u8]) -> Result<(u32, u32), ImageError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

/// Decode image data into a DynamicImage
fn decode_image(data: &[u8]) -> Result<DynamicImage, ImageError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Avif => "avif".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

fn read_exif(data: &[u8]) -> Option<exif::Exif> {
    exif::Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()
}

fn density_from_exif(exif: &exif::Exif) -> Option<f64> {
    let field = exif.get_field(exif::Tag::XResolution, exif::In::PRIMARY)?;
    let value = match field.value {
        exif::Value::Rational(ref v) if !v.is_empty() => v[0].to_f64(),
        _ => return None,
    };
    // ResolutionUnit 3 means centimetres
    let per_cm = exif
        .get_field(exif::Tag::ResolutionUnit, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        == Some(3);
    Some(if per_cm { value * 2.54 } else { value })
}

/// Resize image using fast-image-resize with Lanczos3 filter
fn resize_image(img: &DynamicImage, target_w: u32, target_h: u32) -> Result<DynamicImage, ImageError> {
    let src_width =
        NonZeroU32::new(img.width()).ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ImageError::resize_failed("Failed to create output image buffer"))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}
