//! Cache key derivation
//!
//! A derived key is the content key followed by every present transform
//! parameter in the fixed order `width, height, format, quality`:
//!
//! ```text
//! photos/cat.jpg\x1fwidth=400\x1fformat=webp\x1fquality=80
//! ```
//!
//! The separator is the ASCII unit separator (0x1F). Content keys come from
//! percent-decoded request paths and may contain it, so `%` and the separator
//! are percent-escaped in the content key before the parameters are appended.
//! No content key can forge the parameter suffix of another.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::imaging::OutputFormat;

/// Separator between the content key and each rendered parameter
pub const KEY_SEPARATOR: char = '\u{1f}';

/// Fully resolved parameters of an on-demand request
///
/// `quality` is always concrete: the service fills in the configured default
/// before a key is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransformParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<OutputFormat>,
    pub quality: u8,
}

impl TransformParams {
    pub fn new(quality: u8) -> Self {
        Self {
            width: None,
            height: None,
            format: None,
            quality,
        }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Derive the cache key for `content_key` transformed with `params`
pub fn derive_cache_key(content_key: &str, params: &TransformParams) -> String {
    let content_key = escape_content_key(content_key);
    let mut key = String::with_capacity(content_key.len() + 48);
    key.push_str(&content_key);

    let mut push = |field: &str, value: &dyn std::fmt::Display| {
        key.push(KEY_SEPARATOR);
        key.push_str(field);
        key.push('=');
        key.push_str(&value.to_string());
    };

    if let Some(width) = params.width {
        push("width", &width);
    }
    if let Some(height) = params.height {
        push("height", &height);
    }
    if let Some(format) = params.format {
        push("format", &format);
    }
    push("quality", &params.quality);

    key
}

fn escape_content_key(content_key: &str) -> Cow<'_, str> {
    if !content_key.contains(['%', KEY_SEPARATOR]) {
        return Cow::Borrowed(content_key);
    }
    let mut escaped = String::with_capacity(content_key.len() + 8);
    for c in content_key.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            KEY_SEPARATOR => escaped.push_str("%1F"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}
