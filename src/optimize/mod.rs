//! Batch optimize orchestrator
//!
//! One call takes a complete original through the whole pipeline:
//!
//! ```text
//! probe -> policy decision -> store original -> for each spec: transform + store
//! ```
//!
//! Variants are produced strictly one after another in the order the policy
//! returned them. The first failure aborts the run; no partial manifest is
//! ever returned, though objects stored before the failure stay stored.

mod manifest;

use thiserror::Error;

use crate::imaging::{EngineInput, ImageError, OutputFormat, TransformEngine, TransformRequest};
use crate::metrics::VariantMetrics;
use crate::policy::{Policy, PolicyContext, VariantSpec};
use crate::storage::{ObjectMeta, StorageError, VariantStorage};

pub use manifest::{
    base_filename, original_key, variant_key, Manifest, OriginalInfo, Variant, ORIGINAL_PREFIX,
    VARIANT_PREFIX,
};

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("Failed to probe original: {0}")]
    Probe(#[source] ImageError),

    #[error("Failed to generate {width}w {format} variant: {source}")]
    Transform {
        width: u32,
        format: OutputFormat,
        #[source]
        source: ImageError,
    },

    #[error("Failed to store '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },
}

/// Probe, decide, store the original, then generate and store every variant
pub async fn optimize(
    input: &EngineInput,
    policy: &dyn Policy,
    engine: &dyn TransformEngine,
    storage: &dyn VariantStorage,
) -> Result<Manifest, OptimizeError> {
    let result = run(input, policy, engine, storage).await;
    VariantMetrics::global().record_manifest(result.is_ok());

    match &result {
        Ok(manifest) => tracing::info!(
            filename = %input.filename,
            variants = manifest.variants.len(),
            "Optimized image"
        ),
        Err(err) => tracing::error!(
            filename = %input.filename,
            error = %err,
            "Optimize failed"
        ),
    }
    result
}

async fn run(
    input: &EngineInput,
    policy: &dyn Policy,
    engine: &dyn TransformEngine,
    storage: &dyn VariantStorage,
) -> Result<Manifest, OptimizeError> {
    let metadata = engine.probe(input).await.map_err(OptimizeError::Probe)?;
    let byte_len = input.bytes.len() as u64;

    let original = OriginalInfo {
        width: metadata.width,
        height: metadata.height,
        format: metadata.format.clone(),
        bytes: byte_len,
    };
    let original_meta = ObjectMeta {
        width: metadata.width,
        height: metadata.height,
        format: metadata.format.clone(),
    };

    let ctx = PolicyContext::from_metadata(
        metadata,
        byte_len,
        input.filename.clone(),
        input.content_type.clone(),
    );
    let decision = policy.decide(&ctx);
    tracing::debug!(
        filename = %input.filename,
        width = original.width,
        height = original.height,
        variants = decision.variants.len(),
        "Policy decided"
    );

    let key = original_key(&input.filename);
    storage
        .put(&key, input.bytes.clone(), &input.content_type, &original_meta)
        .await
        .map_err(|source| OptimizeError::Storage { key, source })?;

    let mut variants = Vec::with_capacity(decision.variants.len());
    for spec in &decision.variants {
        variants.push(generate_variant(input, spec, engine, storage).await?);
        VariantMetrics::global().variants_generated.inc();
    }

    Ok(Manifest { original, variants })
}

async fn generate_variant(
    input: &EngineInput,
    spec: &VariantSpec,
    engine: &dyn TransformEngine,
    storage: &dyn VariantStorage,
) -> Result<Variant, OptimizeError> {
    let request = TransformRequest {
        width: Some(spec.width),
        height: None,
        format: Some(spec.format),
        quality: spec.quality,
        crop: spec.crop,
    };

    let transformed = {
        let _timer = VariantMetrics::global().start_transform_timer("optimize");
        engine
            .transform(input, &request)
            .await
            .map_err(|source| OptimizeError::Transform {
                width: spec.width,
                format: spec.format,
                source,
            })?
    };

    // Keyed by the requested width, described by the produced one
    let key = variant_key(&input.filename, spec.width, spec.format);
    let meta = ObjectMeta {
        width: transformed.width,
        height: transformed.height,
        format: transformed.format.as_str().to_string(),
    };
    let bytes = transformed.bytes.len() as u64;
    let stored = storage
        .put(&key, transformed.bytes, spec.format.content_type(), &meta)
        .await
        .map_err(|source| OptimizeError::Storage {
            key: key.clone(),
            source,
        })?;

    tracing::debug!(
        key = %key,
        width = transformed.width,
        height = transformed.height,
        bytes,
        "Stored variant"
    );

    Ok(Variant {
        key,
        url: stored.url,
        width: transformed.width,
        height: transformed.height,
        format: transformed.format,
        bytes,
        crop: spec.crop,
    })
}
