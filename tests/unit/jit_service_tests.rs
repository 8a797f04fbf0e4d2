// Unit tests for the on-demand request handler
// Capabilities are hand-written mocks with call counters so each test can
// assert exactly which steps of the state machine ran.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pixvariant::cache::{
    CacheError, CacheStats, MemoryCache, MemoryCacheConfig, NullCache, VariantCache,
};
use pixvariant::error::ErrorBody;
use pixvariant::imaging::{
    EngineInput, ImageError, ImageMetadata, OutputFormat, TransformEngine, TransformRequest,
    TransformedImage,
};
use pixvariant::jit::{generate_etag, JitConfig, JitRequest, JitService, UrlSigningConfig};
use pixvariant::signing::{sign, SignOptions};
use pixvariant::source::{ImageSource, SourceError, SourceImage};

const ORIGINAL: &[u8] = b"original-jpeg-bytes";

// Engine that encodes the request into the output bytes
#[derive(Default)]
struct CountingEngine {
    transforms: AtomicUsize,
}

impl CountingEngine {
    fn transforms(&self) -> usize {
        self.transforms.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransformEngine for CountingEngine {
    async fn probe(&self, _input: &EngineInput) -> Result<ImageMetadata, ImageError> {
        Ok(ImageMetadata::basic(1600, 1200, "jpeg"))
    }

    async fn transform(
        &self,
        input: &EngineInput,
        request: &TransformRequest,
    ) -> Result<TransformedImage, ImageError> {
        self.transforms.fetch_add(1, Ordering::SeqCst);
        let width = request.width.unwrap_or(1600);
        let height = request.height.unwrap_or(width * 3 / 4);
        let format = request.format.unwrap_or(OutputFormat::Jpeg);
        let bytes = format!(
            "{}:{}x{}:{}:q{}",
            input.filename,
            width,
            height,
            format,
            request.quality.unwrap_or(0)
        );
        Ok(TransformedImage {
            bytes: Bytes::from(bytes),
            width,
            height,
            format,
        })
    }
}

// Engine that always fails
struct FailingEngine;

#[async_trait]
impl TransformEngine for FailingEngine {
    async fn probe(&self, _input: &EngineInput) -> Result<ImageMetadata, ImageError> {
        Err(ImageError::decode_failed("corrupt"))
    }

    async fn transform(
        &self,
        _input: &EngineInput,
        _request: &TransformRequest,
    ) -> Result<TransformedImage, ImageError> {
        Err(ImageError::decode_failed("corrupt"))
    }
}

// Source backed by a map
#[derive(Default)]
struct MapSource {
    images: HashMap<String, SourceImage>,
    resolves: AtomicUsize,
}

impl MapSource {
    fn with_image(key: &str) -> Self {
        let mut images = HashMap::new();
        images.insert(key.to_string(), SourceImage::new(ORIGINAL, "image/jpeg"));
        Self {
            images,
            resolves: AtomicUsize::new(0),
        }
    }

    fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for MapSource {
    async fn resolve(&self, key: &str) -> Result<Option<SourceImage>, SourceError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(self.images.get(key).cloned())
    }
}

// Source whose backend is down
struct BrokenSource;

#[async_trait]
impl ImageSource for BrokenSource {
    async fn resolve(&self, _key: &str) -> Result<Option<SourceImage>, SourceError> {
        Err(SourceError::Unavailable("connection refused".to_string()))
    }
}

// Source that panics mid-call
struct PanickingSource;

#[async_trait]
impl ImageSource for PanickingSource {
    async fn resolve(&self, _key: &str) -> Result<Option<SourceImage>, SourceError> {
        panic!("source exploded");
    }
}

// Cache that records writes and can be told to fail
#[derive(Default)]
struct RecordingCache {
    inner: std::sync::Mutex<HashMap<String, Bytes>>,
    sets: AtomicUsize,
    last_ttl: std::sync::Mutex<Option<Duration>>,
    fail_get: bool,
}

impl RecordingCache {
    fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VariantCache for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        if self.fail_get {
            return Err(CacheError::Unavailable("cache offline".to_string()));
        }
        Ok(self.inner.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, data: Bytes, ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        *self.last_ttl.lock().unwrap() = Some(ttl);
        self.inner.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(CacheStats::default())
    }
}

fn memory_cache() -> Arc<MemoryCache> {
    Arc::new(MemoryCache::new(&MemoryCacheConfig::default()))
}

fn error_body(body: &Bytes) -> ErrorBody {
    serde_json::from_slice(body).expect("error responses carry a JSON body")
}

#[tokio::test]
async fn test_miss_then_hit_then_miss_for_new_width() {
    // Test: first request transforms, identical request is served from
    // cache, a different width transforms again
    let engine = Arc::new(CountingEngine::default());
    let service = JitService::new(
        JitConfig::default(),
        engine.clone(),
        Arc::new(MapSource::with_image("cat.jpg")),
        memory_cache(),
    );

    let first = service.handle(&JitRequest::new("/img/cat.jpg?w=400")).await;
    assert_eq!(first.status, 200);
    assert_eq!(first.header("X-Pixvariant-Cache"), Some("MISS"));
    assert_eq!(engine.transforms(), 1);

    let second = service.handle(&JitRequest::new("/img/cat.jpg?w=400")).await;
    assert_eq!(second.status, 200);
    assert_eq!(second.header("X-Pixvariant-Cache"), Some("HIT"));
    assert_eq!(second.body, first.body, "HIT must serve the cached bytes");
    assert_eq!(second.header("ETag"), first.header("ETag"));
    assert_eq!(engine.transforms(), 1, "HIT must not transform");

    let third = service.handle(&JitRequest::new("/img/cat.jpg?w=800")).await;
    assert_eq!(third.status, 200);
    assert_eq!(third.header("X-Pixvariant-Cache"), Some("MISS"));
    assert_eq!(engine.transforms(), 2);
}

#[tokio::test]
async fn test_transformed_response_headers() {
    // Test: a fresh transform carries content type, cache control and ETag
    let service = JitService::new(
        JitConfig::default(),
        Arc::new(CountingEngine::default()),
        Arc::new(MapSource::with_image("cat.jpg")),
        memory_cache(),
    );

    let response = service
        .handle(&JitRequest::new("/img/cat.jpg?w=400&format=webp&q=70"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/webp"));
    assert_eq!(
        response.header("Cache-Control"),
        Some("public, max-age=31536000, immutable")
    );
    assert_eq!(
        response.header("ETag"),
        Some(generate_etag(&response.body).as_str())
    );
    assert_eq!(response.body, Bytes::from("cat.jpg:400x300:webp:q70"));
}

#[tokio::test]
async fn test_hit_with_matching_etag_is_not_modified() {
    // Test: If-None-Match equal to the cached ETag yields 304 with no body
    let service = JitService::new(
        JitConfig::default(),
        Arc::new(CountingEngine::default()),
        Arc::new(MapSource::with_image("cat.jpg")),
        memory_cache(),
    );

    let first = service.handle(&JitRequest::new("/img/cat.jpg?w=400")).await;
    let etag = first.header("ETag").unwrap().to_string();

    let conditional = service
        .handle(&JitRequest::new("/img/cat.jpg?w=400").with_if_none_match(etag.clone()))
        .await;

    assert_eq!(conditional.status, 304);
    assert!(conditional.body.is_empty());
    assert_eq!(conditional.header("ETag"), Some(etag.as_str()));
    assert_eq!(conditional.header("X-Pixvariant-Cache"), Some("HIT"));
}

#[tokio::test]
async fn test_miss_with_matching_etag_is_not_modified() {
    // Test: the conditional check also applies to freshly transformed bytes
    let engine = Arc::new(CountingEngine::default());
    let service = JitService::new(
        JitConfig::default(),
        engine.clone(),
        Arc::new(MapSource::with_image("cat.jpg")),
        Arc::new(NullCache),
    );
    let etag = generate_etag(b"cat.jpg:400x300:jpeg:q80");

    let response = service
        .handle(&JitRequest::new("/img/cat.jpg?w=400").with_if_none_match(etag))
        .await;

    assert_eq!(response.status, 304);
    assert_eq!(response.header("X-Pixvariant-Cache"), Some("MISS"));
    assert_eq!(engine.transforms(), 1);
}

#[tokio::test]
async fn test_stale_etag_gets_full_response() {
    // Test: a non-matching If-None-Match is ignored
    let service = JitService::new(
        JitConfig::default(),
        Arc::new(CountingEngine::default()),
        Arc::new(MapSource::with_image("cat.jpg")),
        memory_cache(),
    );

    let response = service
        .handle(&JitRequest::new("/img/cat.jpg?w=400").with_if_none_match("\"0000000000000000\""))
        .await;

    assert_eq!(response.status, 200);
    assert!(!response.body.is_empty());
}

#[tokio::test]
async fn test_no_params_serves_original_without_caching() {
    // Test: nothing to change means the original bytes, MISS, no cache write
    let engine = Arc::new(CountingEngine::default());
    let cache = Arc::new(RecordingCache::default());
    let service = JitService::new(
        JitConfig::default(),
        engine.clone(),
        Arc::new(MapSource::with_image("cat.jpg")),
        cache.clone(),
    );

    let response = service.handle(&JitRequest::new("/img/cat.jpg")).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, Bytes::from_static(ORIGINAL));
    assert_eq!(response.header("Content-Type"), Some("image/jpeg"));
    assert_eq!(response.header("X-Pixvariant-Cache"), Some("MISS"));
    assert_eq!(engine.transforms(), 0);
    assert_eq!(cache.sets(), 0);

    // Quality alone is not a transformation
    let response = service.handle(&JitRequest::new("/img/cat.jpg?q=50")).await;
    assert_eq!(response.body, Bytes::from_static(ORIGINAL));
    assert_eq!(engine.transforms(), 0);
}

#[tokio::test]
async fn test_default_format_forces_transform_and_is_cached() {
    // Test: a configured default format counts as a requested format
    let engine = Arc::new(CountingEngine::default());
    let cache = Arc::new(RecordingCache::default());
    let config = JitConfig {
        default_format: Some(OutputFormat::Avif),
        cache_ttl_seconds: 120,
        ..Default::default()
    };
    let service = JitService::new(
        config,
        engine.clone(),
        Arc::new(MapSource::with_image("cat.jpg")),
        cache.clone(),
    );

    let response = service.handle(&JitRequest::new("/img/cat.jpg")).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/avif"));
    assert_eq!(engine.transforms(), 1);
    assert_eq!(cache.sets(), 1);
    assert_eq!(
        *cache.last_ttl.lock().unwrap(),
        Some(Duration::from_secs(120))
    );

    let hit = service.handle(&JitRequest::new("/img/cat.jpg")).await;
    assert_eq!(hit.header("X-Pixvariant-Cache"), Some("HIT"));
    assert_eq!(hit.header("Content-Type"), Some("image/avif"));
}

#[tokio::test]
async fn test_width_over_configured_maximum_is_400() {
    // Test: w=3000 against max_width=2000 is rejected before any capability runs
    let source = Arc::new(MapSource::with_image("cat.jpg"));
    let config = JitConfig {
        max_width: 2000,
        ..Default::default()
    };
    let service = JitService::new(
        config,
        Arc::new(CountingEngine::default()),
        source.clone(),
        memory_cache(),
    );

    let response = service.handle(&JitRequest::new("/img/cat.jpg?w=3000")).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    assert_eq!(
        error_body(&response.body),
        ErrorBody::new("Width exceeds maximum of 2000")
    );
    assert_eq!(source.resolves(), 0);
}

#[tokio::test]
async fn test_disallowed_format_is_400() {
    let config = JitConfig {
        allowed_formats: vec![OutputFormat::WebP, OutputFormat::Jpeg],
        ..Default::default()
    };
    let service = JitService::new(
        config,
        Arc::new(CountingEngine::default()),
        Arc::new(MapSource::with_image("cat.jpg")),
        memory_cache(),
    );

    let response = service
        .handle(&JitRequest::new("/img/cat.jpg?format=png"))
        .await;

    assert_eq!(response.status, 400);
    assert_eq!(
        error_body(&response.body).error,
        "Format not allowed. Use: webp, jpeg"
    );
}

#[tokio::test]
async fn test_unknown_key_is_404() {
    let service = JitService::new(
        JitConfig::default(),
        Arc::new(CountingEngine::default()),
        Arc::new(MapSource::with_image("cat.jpg")),
        memory_cache(),
    );

    let response = service.handle(&JitRequest::new("/img/dog.jpg?w=100")).await;

    assert_eq!(response.status, 404);
    assert_eq!(error_body(&response.body), ErrorBody::new("Image not found"));
}

#[tokio::test]
async fn test_missing_key_is_400() {
    let service = JitService::new(
        JitConfig::default(),
        Arc::new(CountingEngine::default()),
        Arc::new(MapSource::default()),
        memory_cache(),
    );

    for path in ["/img/", "/img/?w=100", "/elsewhere/cat.jpg"] {
        let response = service.handle(&JitRequest::new(path)).await;
        assert_eq!(response.status, 400, "path {}", path);
        assert_eq!(
            error_body(&response.body),
            ErrorBody::new("No image key provided")
        );
    }
}

#[tokio::test]
async fn test_transform_failure_is_500_with_message() {
    let service = JitService::new(
        JitConfig::default(),
        Arc::new(FailingEngine),
        Arc::new(MapSource::with_image("cat.jpg")),
        memory_cache(),
    );

    let response = service.handle(&JitRequest::new("/img/cat.jpg?w=100")).await;

    assert_eq!(response.status, 500);
    let body = error_body(&response.body);
    assert_eq!(body.error, "Image transformation failed");
    assert_eq!(
        body.message.as_deref(),
        Some("Failed to decode image: corrupt")
    );
}

#[tokio::test]
async fn test_source_error_is_generic_500() {
    // Test: backend details stay out of the response body
    let service = JitService::new(
        JitConfig::default(),
        Arc::new(CountingEngine::default()),
        Arc::new(BrokenSource),
        memory_cache(),
    );

    let response = service.handle(&JitRequest::new("/img/cat.jpg?w=100")).await;

    assert_eq!(response.status, 500);
    assert_eq!(
        error_body(&response.body),
        ErrorBody::with_message("Image transformation failed", "Unknown error")
    );
}

#[tokio::test]
async fn test_panicking_source_is_generic_500() {
    let service = JitService::new(
        JitConfig::default(),
        Arc::new(CountingEngine::default()),
        Arc::new(PanickingSource),
        memory_cache(),
    );

    let response = service.handle(&JitRequest::new("/img/cat.jpg?w=100")).await;

    assert_eq!(response.status, 500);
    assert_eq!(
        error_body(&response.body).message.as_deref(),
        Some("Unknown error")
    );
}

#[tokio::test]
async fn test_cache_failure_is_generic_500() {
    let cache = Arc::new(RecordingCache {
        fail_get: true,
        ..Default::default()
    });
    let service = JitService::new(
        JitConfig::default(),
        Arc::new(CountingEngine::default()),
        Arc::new(MapSource::with_image("cat.jpg")),
        cache,
    );

    let response = service.handle(&JitRequest::new("/img/cat.jpg?w=100")).await;

    assert_eq!(response.status, 500);
}

// Engine that returns a fixed number of bytes regardless of the request
struct OversizedEngine {
    size: usize,
}

#[async_trait]
impl TransformEngine for OversizedEngine {
    async fn probe(&self, _input: &EngineInput) -> Result<ImageMetadata, ImageError> {
        Ok(ImageMetadata::basic(4096, 4096, "png"))
    }

    async fn transform(
        &self,
        _input: &EngineInput,
        request: &TransformRequest,
    ) -> Result<TransformedImage, ImageError> {
        Ok(TransformedImage {
            bytes: Bytes::from(vec![0u8; self.size]),
            width: request.width.unwrap_or(4096),
            height: 4096,
            format: OutputFormat::Png,
        })
    }
}

#[tokio::test]
async fn test_variant_over_cache_item_limit_is_served_uncached() {
    // Test: the cache refuses a 2 MiB variant under a 1 MiB item limit; the
    // transformed bytes are still served and the next request transforms again
    let cache = Arc::new(MemoryCache::new(&MemoryCacheConfig {
        max_item_size_mb: 1,
        max_cache_size_mb: 10,
    }));
    let service = JitService::new(
        JitConfig::default(),
        Arc::new(OversizedEngine {
            size: 2 * 1024 * 1024,
        }),
        Arc::new(MapSource::with_image("cat.jpg")),
        cache.clone(),
    );

    let first = service.handle(&JitRequest::new("/img/cat.jpg?w=100")).await;
    assert_eq!(first.status, 200);
    assert_eq!(first.body.len(), 2 * 1024 * 1024);
    assert_eq!(first.header("X-Pixvariant-Cache"), Some("MISS"));
    assert_eq!(first.header("Content-Type"), Some("image/png"));

    let second = service.handle(&JitRequest::new("/img/cat.jpg?w=100")).await;
    assert_eq!(second.status, 200);
    assert_eq!(second.header("X-Pixvariant-Cache"), Some("MISS"));
}

#[tokio::test]
async fn test_encoded_separator_in_path_cannot_poison_another_key() {
    // Test: a source key holding a percent-encoded 0x1F plus a parameter
    // suffix must not share a cache entry with the plain key and that parameter
    let mut images = HashMap::new();
    images.insert(
        "cat.jpg".to_string(),
        SourceImage::new(ORIGINAL, "image/jpeg"),
    );
    images.insert(
        "cat.jpg\u{1f}width=10".to_string(),
        SourceImage::new(ORIGINAL, "image/jpeg"),
    );
    let engine = Arc::new(CountingEngine::default());
    let service = JitService::new(
        JitConfig::default(),
        engine.clone(),
        Arc::new(MapSource {
            images,
            resolves: AtomicUsize::new(0),
        }),
        memory_cache(),
    );

    let planted = service
        .handle(&JitRequest::new("/img/cat.jpg%1Fwidth=10?format=png"))
        .await;
    assert_eq!(planted.status, 200);
    assert_eq!(engine.transforms(), 1);

    let victim = service
        .handle(&JitRequest::new("/img/cat.jpg?w=10&format=png"))
        .await;
    assert_eq!(victim.status, 200);
    assert_eq!(victim.header("X-Pixvariant-Cache"), Some("MISS"));
    assert_eq!(&victim.body[..], b"cat.jpg:10x7:png:q80");
    assert_eq!(engine.transforms(), 2);
}

fn signed_service(engine: Arc<CountingEngine>) -> JitService {
    let config = JitConfig {
        security: Some(UrlSigningConfig {
            secret: "top-secret".to_string(),
        }),
        ..Default::default()
    };
    JitService::new(
        config,
        engine,
        Arc::new(MapSource::with_image("cat.jpg")),
        memory_cache(),
    )
}

#[tokio::test]
async fn test_signed_request_is_served() {
    let engine = Arc::new(CountingEngine::default());
    let service = signed_service(engine.clone());
    let path = sign("/img/cat.jpg?w=400", "top-secret", SignOptions::default());

    let response = service.handle(&JitRequest::new(path)).await;

    assert_eq!(response.status, 200);
    assert_eq!(engine.transforms(), 1);
}

#[tokio::test]
async fn test_signature_does_not_leak_into_cache_key_or_params() {
    // Test: a signed and an expiring URL for the same variant share the cache entry
    let engine = Arc::new(CountingEngine::default());
    let service = signed_service(engine.clone());

    let plain = sign("/img/cat.jpg?w=400", "top-secret", SignOptions::default());
    let expiring = sign("/img/cat.jpg?w=400", "top-secret", SignOptions::expires_in(600));

    assert_eq!(service.handle(&JitRequest::new(plain)).await.status, 200);
    let second = service.handle(&JitRequest::new(expiring)).await;
    assert_eq!(second.status, 200);
    assert_eq!(second.header("X-Pixvariant-Cache"), Some("HIT"));
    assert_eq!(engine.transforms(), 1);
}

#[tokio::test]
async fn test_tampered_or_unsigned_request_is_403() {
    let engine = Arc::new(CountingEngine::default());
    let service = signed_service(engine.clone());
    let signed = sign("/img/cat.jpg?w=400", "top-secret", SignOptions::default());
    let tampered = signed.replace("w=400", "w=4000");
    let foreign = sign("/img/cat.jpg?w=400", "other-secret", SignOptions::default());

    for path in [tampered.as_str(), foreign.as_str(), "/img/cat.jpg?w=400"] {
        let response = service.handle(&JitRequest::new(path)).await;
        assert_eq!(response.status, 403, "path {}", path);
        assert_eq!(error_body(&response.body), ErrorBody::new("Invalid signature"));
    }
    assert_eq!(engine.transforms(), 0);
}

#[tokio::test]
async fn test_expired_signature_is_403() {
    let service = signed_service(Arc::new(CountingEngine::default()));
    let expired = pixvariant::signing::sign_at(
        "/img/cat.jpg?w=400",
        "top-secret",
        SignOptions::expires_in(60),
        1_000,
    );

    let response = service.handle(&JitRequest::new(expired)).await;

    assert_eq!(response.status, 403);
}

#[tokio::test]
async fn test_into_http_round_trip() {
    let service = JitService::new(
        JitConfig::default(),
        Arc::new(CountingEngine::default()),
        Arc::new(MapSource::with_image("cat.jpg")),
        memory_cache(),
    );
    let request = http::Request::builder()
        .uri("/img/cat.jpg?w=200&format=png")
        .body(())
        .unwrap();

    let response = service
        .handle(&JitRequest::from_http(&request))
        .await
        .into_http()
        .unwrap();

    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(response.headers()["x-pixvariant-cache"], "MISS");
}

#[test]
fn test_service_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<JitService>();
}
