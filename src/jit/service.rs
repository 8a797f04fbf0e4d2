//! On-demand request handler
//!
//! Each request walks a fixed sequence of steps and always ends in exactly
//! one [`JitResponse`]:
//!
//! 1. signature check (only with a configured secret)
//! 2. content key extraction
//! 3. parameter validation
//! 4. cache lookup
//! 5. source resolve
//! 6. transform decision
//! 7. transform
//! 8. cache populate (variants over the cache's item limit are served uncached)
//! 9. respond
//!
//! Capability failures are never retried here.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::config::JitConfig;
use super::params::{needs_transform, parse_params};
use super::response::{
    error_response, resolve_content_type, serve_bytes, CacheStatus, JitResponse, ServeOptions,
};
use crate::cache::{derive_cache_key, CacheError, TransformParams, VariantCache};
use crate::error::ServiceError;
use crate::imaging::{EngineInput, TransformEngine, TransformRequest};
use crate::metrics::VariantMetrics;
use crate::signing::{self, split_path_and_query, QueryPairs};
use crate::source::ImageSource;

/// Cache label for responses that never reached the cache lookup
const CACHE_LABEL_NONE: &str = "none";

/// An inbound on-demand request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JitRequest {
    /// Raw path and query exactly as received, e.g. `/img/cat.jpg?w=400&s=...`
    pub path_and_query: String,
    pub if_none_match: Option<String>,
}

impl JitRequest {
    pub fn new(path_and_query: impl Into<String>) -> Self {
        Self {
            path_and_query: path_and_query.into(),
            if_none_match: None,
        }
    }

    pub fn with_if_none_match(mut self, etag: impl Into<String>) -> Self {
        self.if_none_match = Some(etag.into());
        self
    }

    /// Build from an `http::Request`, keeping the query untouched
    pub fn from_http<B>(request: &http::Request<B>) -> Self {
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());

        let if_none_match = request
            .headers()
            .get(http::header::IF_NONE_MATCH)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Self {
            path_and_query,
            if_none_match,
        }
    }
}

/// On-demand transformation service
pub struct JitService {
    config: JitConfig,
    engine: Arc<dyn TransformEngine>,
    source: Arc<dyn ImageSource>,
    cache: Arc<dyn VariantCache>,
}

impl JitService {
    pub fn new(
        config: JitConfig,
        engine: Arc<dyn TransformEngine>,
        source: Arc<dyn ImageSource>,
        cache: Arc<dyn VariantCache>,
    ) -> Self {
        Self {
            config,
            engine,
            source,
            cache,
        }
    }

    pub fn config(&self) -> &JitConfig {
        &self.config
    }

    /// Handle one request; never fails, every outcome is a response
    pub async fn handle(&self, request: &JitRequest) -> JitResponse {
        let (response, cache_label) = match self.process(request).await {
            Ok((response, cache)) => {
                tracing::info!(
                    path = %request.path_and_query,
                    status = response.status,
                    cache = cache.as_str(),
                    bytes = response.body.len(),
                    "Served variant"
                );
                (response, cache.as_label())
            }
            Err(err) => {
                if err.is_server_error() {
                    tracing::error!(
                        path = %request.path_and_query,
                        status = err.to_http_status(),
                        error = %err,
                        "On-demand request failed"
                    );
                } else {
                    tracing::warn!(
                        path = %request.path_and_query,
                        status = err.to_http_status(),
                        error = %err,
                        "On-demand request rejected"
                    );
                }
                (error_response(&err), CACHE_LABEL_NONE)
            }
        };

        VariantMetrics::global().record_jit_request(response.status, cache_label);
        response
    }

    async fn process(
        &self,
        request: &JitRequest,
    ) -> Result<(JitResponse, CacheStatus), ServiceError> {
        let raw = request.path_and_query.as_str();

        if let Some(secret) = self.config.secret() {
            if !signing::verify(raw, secret) {
                return Err(ServiceError::InvalidSignature);
            }
            tracing::debug!(path = %raw, "Signature verified");
        }

        let (path, query) = split_path_and_query(raw);
        let key = self.extract_key(path).ok_or(ServiceError::MissingKey)?;
        let params = parse_params(&QueryPairs::parse(query), &self.config)?;
        let if_none_match = request.if_none_match.as_deref();

        let cache_key = derive_cache_key(&key, &params);
        let cached = guarded("cache get", self.cache.get(&cache_key))
            .await?
            .map_err(|e| ServiceError::Unknown(format!("cache get failed: {}", e)))?;

        if let Some(bytes) = cached {
            tracing::debug!(key = %key, cache_key = %cache_key, "Cache hit");
            let content_type = resolve_content_type(params.format, &bytes);
            let response = serve_bytes(
                bytes,
                content_type,
                if_none_match,
                self.serve_options(CacheStatus::Hit),
            );
            return Ok((response, CacheStatus::Hit));
        }
        tracing::debug!(key = %key, cache_key = %cache_key, "Cache miss");

        let original = guarded("source resolve", self.source.resolve(&key))
            .await?
            .map_err(|e| ServiceError::Unknown(format!("source resolve failed: {}", e)))?
            .ok_or(ServiceError::NotFound)?;

        if !needs_transform(&params) {
            tracing::debug!(key = %key, "No transform requested, serving original");
            let response = serve_bytes(
                original.bytes,
                &original.content_type,
                if_none_match,
                self.serve_options(CacheStatus::Miss),
            );
            return Ok((response, CacheStatus::Miss));
        }

        let input = EngineInput::new(key.clone(), original.bytes, original.content_type);
        let transform_request = to_transform_request(&params);
        let transformed = {
            let _timer = VariantMetrics::global().start_transform_timer("jit");
            guarded(
                "transform",
                self.engine.transform(&input, &transform_request),
            )
            .await?
            .map_err(|e| ServiceError::TransformFailure(e.to_string()))?
        };
        tracing::debug!(
            key = %key,
            width = transformed.width,
            height = transformed.height,
            format = %transformed.format,
            bytes = transformed.bytes.len(),
            "Transformed variant"
        );

        let stored = guarded(
            "cache set",
            self.cache
                .set(&cache_key, transformed.bytes.clone(), self.config.cache_ttl()),
        )
        .await?;
        match stored {
            Ok(()) => {}
            Err(CacheError::ItemTooLarge {
                size_bytes,
                max_bytes,
            }) => {
                tracing::warn!(
                    key = %key,
                    size_bytes,
                    max_bytes,
                    "Variant too large to cache, serving uncached"
                );
            }
            Err(e) => return Err(ServiceError::Unknown(format!("cache set failed: {}", e))),
        }

        let response = serve_bytes(
            transformed.bytes,
            transformed.format.content_type(),
            if_none_match,
            self.serve_options(CacheStatus::Miss),
        );
        Ok((response, CacheStatus::Miss))
    }

    /// Content key from the request path; `None` when absent or empty
    fn extract_key(&self, path: &str) -> Option<String> {
        let raw = path.strip_prefix(self.config.route_prefix.as_str())?;
        if raw.is_empty() {
            return None;
        }
        let key = urlencoding::decode(raw)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }

    fn serve_options(&self, cache_status: CacheStatus) -> ServeOptions<'_> {
        ServeOptions {
            cache_control: &self.config.cache_control,
            cache_status_header: &self.config.cache_status_header,
            cache_status,
        }
    }
}

fn to_transform_request(params: &TransformParams) -> TransformRequest {
    TransformRequest {
        width: params.width,
        height: params.height,
        format: params.format,
        quality: Some(params.quality),
        crop: None,
    }
}

/// Run a capability call, turning a panic into `ServiceError::Unknown`
async fn guarded<T, F>(step: &'static str, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .map_err(|panic| ServiceError::Unknown(format!("{} panicked: {}", step, panic_message(&*panic))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
