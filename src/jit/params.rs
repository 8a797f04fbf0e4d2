//! Request parameter parsing
//!
//! Recognized query parameters:
//!
//! | name     | meaning                 | rule                         |
//! |----------|-------------------------|------------------------------|
//! | `w`      | target width            | integer in `1..=max_width`   |
//! | `h`      | target height           | integer in `1..=max_height`  |
//! | `format` | output format           | member of `allowed_formats`  |
//! | `q`      | output quality          | integer in `1..=100`         |
//!
//! A parameter that is present but empty is invalid, not absent.

use super::config::JitConfig;
use crate::cache::TransformParams;
use crate::error::ServiceError;
use crate::imaging::OutputFormat;
use crate::signing::QueryPairs;

/// Parse and validate transform parameters, filling in configured defaults
///
/// The returned `format` is the effective one: the requested format, else
/// the configured default, else `None` (keep the original format).
pub fn parse_params(query: &QueryPairs, config: &JitConfig) -> Result<TransformParams, ServiceError> {
    let mut params = TransformParams::new(config.default_quality);

    if let Some(raw) = query.get_decoded("w") {
        params.width = Some(parse_dimension(&raw, config.max_width, "width", "Width")?);
    }

    if let Some(raw) = query.get_decoded("h") {
        params.height = Some(parse_dimension(&raw, config.max_height, "height", "Height")?);
    }

    params.format = match query.get_decoded("format") {
        Some(raw) => Some(parse_format(&raw, &config.allowed_formats)?),
        None => config.default_format,
    };

    if let Some(raw) = query.get_decoded("q") {
        params.quality = match parse_integer(&raw) {
            Some(q) if (1..=100).contains(&q) => q as u8,
            _ => return Err(invalid("Quality must be 1-100")),
        };
    }

    Ok(params)
}

/// True when the request asks for any change to the original
pub fn needs_transform(params: &TransformParams) -> bool {
    params.width.is_some() || params.height.is_some() || params.format.is_some()
}

fn parse_dimension(raw: &str, max: u32, name: &str, label: &str) -> Result<u32, ServiceError> {
    match parse_integer(raw) {
        Some(0) | None => Err(invalid(format!("Invalid {}", name))),
        Some(value) if value > u64::from(max) => {
            Err(invalid(format!("{} exceeds maximum of {}", label, max)))
        }
        Some(value) => Ok(value as u32),
    }
}

fn parse_format(raw: &str, allowed: &[OutputFormat]) -> Result<OutputFormat, ServiceError> {
    allowed
        .iter()
        .copied()
        .find(|format| format.as_str() == raw)
        .ok_or_else(|| {
            let names: Vec<&str> = allowed.iter().map(|f| f.as_str()).collect();
            invalid(format!("Format not allowed. Use: {}", names.join(", ")))
        })
}

/// Unsigned decimal integer, surrounding whitespace tolerated
fn parse_integer(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Overflowing digit strings are still "too large", not malformed
    Some(trimmed.parse::<u64>().unwrap_or(u64::MAX))
}

fn invalid(message: impl Into<String>) -> ServiceError {
    ServiceError::InvalidParameter(message.into())
}
