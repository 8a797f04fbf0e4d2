// Unit tests for the batch optimize orchestrator
// Covers manifest shape, ordering, storage layout and abort semantics.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::Cursor;
use std::sync::Mutex;

use pixvariant::imaging::{
    CropStrategy, EngineInput, ImageError, ImageMetadata, OutputFormat, RasterEngine,
    TransformEngine, TransformRequest, TransformedImage,
};
use pixvariant::optimize::{optimize, Manifest, OptimizeError, OriginalInfo};
use pixvariant::policy::{
    compile, default_policy, Condition, NumericCondition, PolicyContext, PolicyDecision,
    PolicySchema, Rule, VariantSpec,
};
use pixvariant::storage::{
    LocalStorage, MemoryStorage, ObjectMeta, StorageError, StoredObject, VariantStorage,
};

// Engine reporting a fixed 800x600 jpeg; transforms keep 4:3 and record requests
#[derive(Default)]
struct ScriptedEngine {
    requests: Mutex<Vec<TransformRequest>>,
}

#[async_trait]
impl TransformEngine for ScriptedEngine {
    async fn probe(&self, _input: &EngineInput) -> Result<ImageMetadata, ImageError> {
        Ok(ImageMetadata::basic(800, 600, "jpeg"))
    }

    async fn transform(
        &self,
        _input: &EngineInput,
        request: &TransformRequest,
    ) -> Result<TransformedImage, ImageError> {
        self.requests.lock().unwrap().push(request.clone());
        let width = request.width.unwrap_or(800).min(800);
        Ok(TransformedImage {
            bytes: Bytes::from(vec![7u8; width as usize]),
            width,
            height: width * 3 / 4,
            format: request.format.unwrap_or(OutputFormat::Jpeg),
        })
    }
}

// Storage that rejects one key
struct RejectingStorage {
    inner: MemoryStorage,
    reject: &'static str,
}

#[async_trait]
impl VariantStorage for RejectingStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        meta: &ObjectMeta,
    ) -> Result<StoredObject, StorageError> {
        if key == self.reject {
            return Err(StorageError::Backend("bucket full".to_string()));
        }
        self.inner.put(key, bytes, content_type, meta).await
    }
}

fn jpeg_input() -> EngineInput {
    EngineInput::new("photo.jpg", vec![1u8; 2048], "image/jpeg")
}

fn two_webp_widths(_ctx: &PolicyContext) -> PolicyDecision {
    PolicyDecision::new(vec![
        VariantSpec::new(200, OutputFormat::WebP),
        VariantSpec::new(400, OutputFormat::WebP),
    ])
}

#[tokio::test]
async fn test_manifest_for_two_variants() {
    // Test: 800x600 jpeg + two webp specs -> original facts and two ordered variants
    let storage = MemoryStorage::new("/uploads");
    let engine = ScriptedEngine::default();

    let manifest = optimize(&jpeg_input(), &two_webp_widths, &engine, &storage)
        .await
        .unwrap();

    assert_eq!(
        manifest.original,
        OriginalInfo {
            width: 800,
            height: 600,
            format: "jpeg".to_string(),
            bytes: 2048,
        }
    );
    assert_eq!(manifest.variants.len(), 2);
    assert_eq!(manifest.variants[0].key, "variants/photo_200w.webp");
    assert_eq!(manifest.variants[1].key, "variants/photo_400w.webp");
    assert_eq!(manifest.variants[0].url, "/uploads/variants/photo_200w.webp");
    assert_eq!(manifest.variants[1].bytes, 400);
    assert_eq!(manifest.variants[1].height, 300);
    assert_eq!(manifest.variants[1].format, OutputFormat::WebP);
}

#[tokio::test]
async fn test_original_and_variants_are_stored_with_metadata() {
    let storage = MemoryStorage::new("/uploads");
    let engine = ScriptedEngine::default();

    optimize(&jpeg_input(), &two_webp_widths, &engine, &storage)
        .await
        .unwrap();

    let original = storage.get("original/photo.jpg").await.unwrap();
    assert_eq!(original.content_type, "image/jpeg");
    assert_eq!(original.bytes.len(), 2048);
    assert_eq!(
        original.meta,
        ObjectMeta {
            width: 800,
            height: 600,
            format: "jpeg".to_string(),
        }
    );

    let variant = storage.get("variants/photo_200w.webp").await.unwrap();
    assert_eq!(variant.content_type, "image/webp");
    assert_eq!(variant.meta.width, 200);
    assert_eq!(variant.meta.height, 150);
    assert_eq!(variant.meta.format, "webp");
}

#[tokio::test]
async fn test_manifest_reports_actual_not_requested_dimensions() {
    // Test: the engine caps width at 800; the key keeps the requested width
    let storage = MemoryStorage::default();
    let engine = ScriptedEngine::default();
    let policy =
        |_ctx: &PolicyContext| PolicyDecision::new(vec![VariantSpec::new(1200, OutputFormat::Avif)]);

    let manifest = optimize(&jpeg_input(), &policy, &engine, &storage)
        .await
        .unwrap();

    let variant = &manifest.variants[0];
    assert_eq!(variant.key, "variants/photo_1200w.avif");
    assert_eq!(variant.width, 800);
    assert_eq!(variant.height, 600);
}

#[tokio::test]
async fn test_spec_quality_and_crop_reach_the_engine() {
    let storage = MemoryStorage::default();
    let engine = ScriptedEngine::default();
    let policy = |_ctx: &PolicyContext| {
        PolicyDecision::new(vec![VariantSpec::new(300, OutputFormat::Jpeg)
            .with_quality(55)
            .with_crop(CropStrategy::Top)])
    };

    let manifest = optimize(&jpeg_input(), &policy, &engine, &storage)
        .await
        .unwrap();

    let requests = engine.requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec![TransformRequest {
            width: Some(300),
            height: None,
            format: Some(OutputFormat::Jpeg),
            quality: Some(55),
            crop: Some(CropStrategy::Top),
        }]
    );
    assert_eq!(manifest.variants[0].crop, Some(CropStrategy::Top));
}

#[tokio::test]
async fn test_empty_decision_still_stores_original() {
    let storage = MemoryStorage::default();
    let engine = ScriptedEngine::default();
    let policy = compile(PolicySchema {
        name: "large-only".to_string(),
        rules: vec![Rule {
            name: None,
            condition: Some(Condition {
                width: Some(NumericCondition::gt(2000)),
                ..Default::default()
            }),
            result: PolicyDecision::new(vec![VariantSpec::new(1000, OutputFormat::WebP)]),
        }],
    });

    let manifest = optimize(&jpeg_input(), &policy, &engine, &storage)
        .await
        .unwrap();

    assert!(manifest.variants.is_empty());
    assert_eq!(storage.keys().await, vec!["original/photo.jpg".to_string()]);
    assert!(engine.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_storage_failure_aborts_remaining_variants() {
    // Test: the second variant cannot be stored, so no manifest and no third transform
    let storage = RejectingStorage {
        inner: MemoryStorage::default(),
        reject: "variants/photo_400w.webp",
    };
    let engine = ScriptedEngine::default();
    let policy = |_ctx: &PolicyContext| {
        PolicyDecision::new(vec![
            VariantSpec::new(200, OutputFormat::WebP),
            VariantSpec::new(400, OutputFormat::WebP),
            VariantSpec::new(600, OutputFormat::WebP),
        ])
    };

    let err = optimize(&jpeg_input(), &policy, &engine, &storage)
        .await
        .unwrap_err();

    match err {
        OptimizeError::Storage { key, .. } => assert_eq!(key, "variants/photo_400w.webp"),
        other => panic!("expected storage error, got {:?}", other),
    }
    assert_eq!(engine.requests.lock().unwrap().len(), 2);
}

fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

#[tokio::test]
async fn test_raster_engine_with_local_storage() {
    // Test: real decode/resize/encode, files land under the base dir
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), "https://cdn.example.com/assets");
    let input = EngineInput::new("banner.png", create_test_png(80, 60), "image/png");
    let policy = |_ctx: &PolicyContext| {
        PolicyDecision::new(vec![
            VariantSpec::new(20, OutputFormat::Png),
            VariantSpec::new(40, OutputFormat::Jpeg).with_quality(70),
        ])
    };

    let manifest: Manifest = optimize(&input, &policy, &RasterEngine::default(), &storage)
        .await
        .unwrap();

    assert_eq!(manifest.original.width, 80);
    assert_eq!(manifest.original.height, 60);
    assert_eq!(manifest.original.format, "png");

    assert_eq!((manifest.variants[0].width, manifest.variants[0].height), (20, 15));
    assert_eq!((manifest.variants[1].width, manifest.variants[1].height), (40, 30));
    assert_eq!(
        manifest.variants[1].url,
        "https://cdn.example.com/assets/variants/banner_40w.jpeg"
    );

    assert!(dir.path().join("original/banner.png").is_file());
    let small = std::fs::read(dir.path().join("variants/banner_20w.png")).unwrap();
    assert_eq!(small.len() as u64, manifest.variants[0].bytes);
    assert_eq!(&small[0..4], &[0x89, 0x50, 0x4E, 0x47]);
}

#[tokio::test]
async fn test_default_policy_produces_three_webp_widths() {
    let storage = MemoryStorage::default();
    let engine = ScriptedEngine::default();
    let policy = default_policy();

    let manifest = optimize(&jpeg_input(), &policy, &engine, &storage)
        .await
        .unwrap();

    let keys: Vec<&str> = manifest.variants.iter().map(|v| v.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "variants/photo_400w.webp",
            "variants/photo_800w.webp",
            "variants/photo_1200w.webp"
        ]
    );
    let qualities: Vec<Option<u8>> = engine
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.quality)
        .collect();
    assert_eq!(qualities, vec![Some(80), Some(85), Some(90)]);
}
