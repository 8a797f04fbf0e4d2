//! Variant policies
//!
//! A policy maps facts about an original image ([`PolicyContext`]) to the
//! list of variants worth producing ([`PolicyDecision`]). Two kinds of
//! policy satisfy the same [`Policy`] trait:
//!
//! - a declarative [`PolicySchema`] compiled with [`compile`] into a
//!   first-match rule evaluator ([`CompiledPolicy`])
//! - any closure `Fn(&PolicyContext) -> PolicyDecision`
//!
//! Evaluation is pure: no I/O, no interior state, safe to call from any
//! number of tasks at once.

pub mod engine;
pub mod schema;

use serde::{Deserialize, Serialize};

use crate::imaging::{CropStrategy, ImageMetadata, OutputFormat};

pub use engine::{compile, CompiledPolicy};
pub use schema::{Condition, NumericCondition, PolicySchema, Rule, SetCondition};

/// Read-only input to policy evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyContext {
    pub width: u32,
    pub height: u32,
    /// Byte length of the original
    pub bytes: u64,
    pub format: String,
    pub filename: String,
    pub content_type: String,
    pub metadata: ImageMetadata,
}

impl PolicyContext {
    /// Build a context from probed metadata plus facts about the upload
    pub fn from_metadata(
        metadata: ImageMetadata,
        bytes: u64,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            width: metadata.width,
            height: metadata.height,
            bytes,
            format: metadata.format.clone(),
            filename: filename.into(),
            content_type: content_type.into(),
            metadata,
        }
    }
}

/// One variant to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantSpec {
    pub width: u32,
    pub format: OutputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropStrategy>,
}

impl VariantSpec {
    pub fn new(width: u32, format: OutputFormat) -> Self {
        Self {
            width,
            format,
            quality: None,
            crop: None,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_crop(mut self, crop: CropStrategy) -> Self {
        self.crop = Some(crop);
        self
    }
}

/// Ordered variant list; empty means "produce nothing"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    #[serde(default)]
    pub variants: Vec<VariantSpec>,
}

impl PolicyDecision {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(variants: Vec<VariantSpec>) -> Self {
        Self { variants }
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Anything that turns a context into a decision
pub trait Policy: Send + Sync {
    fn decide(&self, ctx: &PolicyContext) -> PolicyDecision;
}

impl<F> Policy for F
where
    F: Fn(&PolicyContext) -> PolicyDecision + Send + Sync,
{
    fn decide(&self, ctx: &PolicyContext) -> PolicyDecision {
        self(ctx)
    }
}

/// Fallback used by uploads when no policy is configured:
/// three responsive WebP widths
pub fn default_policy() -> impl Policy {
    |_ctx: &PolicyContext| {
        PolicyDecision::new(vec![
            VariantSpec::new(400, OutputFormat::WebP).with_quality(80),
            VariantSpec::new(800, OutputFormat::WebP).with_quality(85),
            VariantSpec::new(1200, OutputFormat::WebP).with_quality(90),
        ])
    }
}
