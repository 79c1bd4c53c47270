use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::lang::Language;

pub const REVIEWS_TOTAL: &str = "absa_reviews_total";
pub const SEGMENTS_TOTAL: &str = "absa_segments_total";
pub const ASPECT_HITS_TOTAL: &str = "absa_aspect_hits_total";
pub const SCORER_ERRORS_TOTAL: &str = "absa_scorer_errors_total";
pub const ANALYZE_MS: &str = "absa_analyze_ms";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Fails if a recorder is already set.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        describe_counter!(REVIEWS_TOTAL, "Reviews analysed successfully");
        describe_counter!(SEGMENTS_TOTAL, "Segments produced by the segmenter");
        describe_counter!(ASPECT_HITS_TOTAL, "Aspect matches across all segments");
        describe_counter!(SCORER_ERRORS_TOTAL, "Failed sentiment scorer calls");
        describe_histogram!(ANALYZE_MS, "Wall time of one review analysis in milliseconds");

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

// Without an installed recorder these are no-ops (CLI runs, tests).
pub fn record_review(segments: usize, aspect_hits: usize, elapsed_ms: f64) {
    counter!(REVIEWS_TOTAL).increment(1);
    counter!(SEGMENTS_TOTAL).increment(segments as u64);
    counter!(ASPECT_HITS_TOTAL).increment(aspect_hits as u64);
    histogram!(ANALYZE_MS).record(elapsed_ms);
}

pub fn record_scorer_error(lang: Language) {
    counter!(SCORER_ERRORS_TOTAL, "language" => lang.code()).increment(1);
}
