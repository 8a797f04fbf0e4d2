// Variant service Prometheus metrics
//
// - On-demand request counters by status and cache outcome
// - Transform latency histograms by caller (on-demand vs batch)
// - Batch orchestrator counters (variants generated, manifests by outcome)

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Global metrics registry for the variant service
pub struct VariantMetrics {
    /// On-demand responses by HTTP status and cache outcome (hit, miss, none)
    pub jit_requests: IntCounterVec,

    /// Transform call duration by path (jit, optimize)
    pub transform_duration: HistogramVec,

    /// Variants persisted by the batch orchestrator
    pub variants_generated: IntCounter,

    /// Optimize invocations by outcome (success, failure)
    pub manifests: IntCounterVec,
}

/// Global singleton instance of metrics
static METRICS: OnceLock<VariantMetrics> = OnceLock::new();

impl VariantMetrics {
    /// Initialize and return the global metrics instance
    ///
    /// Registration happens once against the default registry; subsequent
    /// calls return the same instance.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let jit_requests = register_int_counter_vec!(
                "pixvariant_jit_requests_total",
                "On-demand variant requests by response status and cache outcome",
                &["status", "cache"]
            )
            .expect("Failed to register jit_requests_total metric");

            let transform_duration = register_histogram_vec!(
                "pixvariant_transform_duration_seconds",
                "Duration of transform capability calls in seconds",
                &["path"], // jit, optimize
                vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
            )
            .expect("Failed to register transform_duration_seconds metric");

            let variants_generated = register_int_counter!(
                "pixvariant_variants_generated_total",
                "Variants generated and stored by the batch orchestrator"
            )
            .expect("Failed to register variants_generated_total metric");

            let manifests = register_int_counter_vec!(
                "pixvariant_manifests_total",
                "Batch optimize invocations by outcome",
                &["outcome"] // success, failure
            )
            .expect("Failed to register manifests_total metric");

            VariantMetrics {
                jit_requests,
                transform_duration,
                variants_generated,
                manifests,
            }
        })
    }

    /// Count one on-demand response
    pub fn record_jit_request(&self, status: u16, cache: &str) {
        self.jit_requests
            .with_label_values(&[&status.to_string(), cache])
            .inc();
    }

    /// Count one finished optimize call
    pub fn record_manifest(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.manifests.with_label_values(&[outcome]).inc();
    }

    /// Start timing a transform call for `path`
    pub fn start_transform_timer(&self, path: &str) -> HistogramTimer {
        HistogramTimer {
            histogram: self.transform_duration.with_label_values(&[path]),
            start: std::time::Instant::now(),
        }
    }
}

/// RAII timer for histogram metrics
///
/// Records the elapsed time exactly once, when dropped.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Observe now and consume the timer
    pub fn observe_duration(self) {
        drop(self);
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Render the default registry in the Prometheus text exposition format
pub fn gather_text() -> String {
    // Make sure our families exist even before the first request
    let _ = VariantMetrics::global();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %err, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
