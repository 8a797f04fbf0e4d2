//! Response building for the on-demand service
//!
//! The handler returns structured [`JitResponse`] values instead of writing
//! to a transport; callers convert them with [`JitResponse::into_http`].

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::error::ServiceError;
use crate::imaging::OutputFormat;

/// Cache outcome reported in the cache-status header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }

    /// Lowercase metric label
    pub fn as_label(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }
}

/// Transport-agnostic response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JitResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl JitResponse {
    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Decode an error body, if this is an error response
    pub fn error_body(&self) -> Option<crate::error::ErrorBody> {
        if self.status < 400 {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    pub fn into_http(self) -> Result<http::Response<Bytes>, http::Error> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(self.body)
    }
}

/// Headers shared by 200 and 304 responses
#[derive(Debug, Clone, Copy)]
pub struct ServeOptions<'a> {
    pub cache_control: &'a str,
    pub cache_status_header: &'a str,
    pub cache_status: CacheStatus,
}

/// Result of conditional request validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalResult {
    /// ETags match - return 304 with ETag
    NotModified { etag: String },
    /// No match - serve full response
    Modified { etag: String },
}

/// Content hash ETag: first 16 hex chars of SHA-256, quoted
pub fn generate_etag(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let hex = hex::encode(digest);
    format!("\"{}\"", &hex[..16])
}

/// Compare the client's `If-None-Match` against the payload's ETag
pub fn handle_conditional_request(bytes: &[u8], if_none_match: Option<&str>) -> ConditionalResult {
    let etag = generate_etag(bytes);
    match if_none_match {
        Some(client_etag) if client_etag.trim() == etag => ConditionalResult::NotModified { etag },
        _ => ConditionalResult::Modified { etag },
    }
}

/// 200 with body, or 304 when the client already holds these bytes
pub fn serve_bytes(
    bytes: Bytes,
    content_type: &str,
    if_none_match: Option<&str>,
    options: ServeOptions<'_>,
) -> JitResponse {
    match handle_conditional_request(&bytes, if_none_match) {
        ConditionalResult::NotModified { etag } => build_not_modified_response(etag, options),
        ConditionalResult::Modified { etag } => JitResponse {
            status: 200,
            headers: vec![
                ("Content-Type".to_string(), content_type.to_string()),
                ("Content-Length".to_string(), bytes.len().to_string()),
                ("Cache-Control".to_string(), options.cache_control.to_string()),
                ("ETag".to_string(), etag),
                (
                    options.cache_status_header.to_string(),
                    options.cache_status.as_str().to_string(),
                ),
            ],
            body: bytes,
        },
    }
}

/// 304 Not Modified, empty body
pub fn build_not_modified_response(etag: String, options: ServeOptions<'_>) -> JitResponse {
    JitResponse {
        status: 304,
        headers: vec![
            ("Cache-Control".to_string(), options.cache_control.to_string()),
            ("ETag".to_string(), etag),
            (
                options.cache_status_header.to_string(),
                options.cache_status.as_str().to_string(),
            ),
        ],
        body: Bytes::new(),
    }
}

/// JSON error response for a failed request
pub fn error_response(err: &ServiceError) -> JitResponse {
    let body = err.to_body().to_json();
    JitResponse {
        status: err.to_http_status(),
        headers: vec![
            (
                "Content-Type".to_string(),
                "application/json".to_string(),
            ),
            ("Content-Length".to_string(), body.len().to_string()),
        ],
        body: Bytes::from(body),
    }
}

/// Content type for cached bytes: the effective format, else sniffed
pub fn resolve_content_type(format: Option<OutputFormat>, bytes: &[u8]) -> &'static str {
    if let Some(format) = format {
        return format.content_type();
    }
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::WebP) => "image/webp",
        Ok(image::ImageFormat::Avif) => "image/avif",
        Ok(image::ImageFormat::Gif) => "image/gif",
        _ => "application/octet-stream",
    }
}
