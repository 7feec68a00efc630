//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    API_ERRORS_TOTAL, ENGINE_INSTANCES_ACTIVE, ENGINE_RELEASE_FAILURES_TOTAL, EXPORTS_TOTAL,
    EXPORT_DURATION, RENDERS_TOTAL, RENDER_DURATION,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording render metrics
pub struct RenderMetrics;

impl RenderMetrics {
    /// Record a successful render
    pub fn record_success(duration: Duration) {
        RENDERS_TOTAL.with_label_values(&["success"]).inc();
        RENDER_DURATION.observe(duration.as_secs_f64());
    }

    /// Record a failed render, labelled with the error kind
    pub fn record_failure(kind: &str, duration: Duration) {
        RENDERS_TOTAL.with_label_values(&[kind]).inc();
        RENDER_DURATION.observe(duration.as_secs_f64());
    }
}

/// Helper struct for recording export metrics
pub struct ExportMetrics;

impl ExportMetrics {
    pub fn record_success(duration: Duration) {
        EXPORTS_TOTAL.with_label_values(&["success"]).inc();
        EXPORT_DURATION.observe(duration.as_secs_f64());
    }

    /// Record a failed export, labelled with the failing stage
    pub fn record_failure(stage: &str, duration: Duration) {
        EXPORTS_TOTAL.with_label_values(&[stage]).inc();
        EXPORT_DURATION.observe(duration.as_secs_f64());
    }
}

/// Helper struct for tracking engine instance lifecycle
pub struct EngineMetrics;

impl EngineMetrics {
    pub fn record_launched() {
        ENGINE_INSTANCES_ACTIVE.inc();
    }

    pub fn record_released() {
        ENGINE_INSTANCES_ACTIVE.dec();
    }

    pub fn record_release_failure() {
        ENGINE_RELEASE_FAILURES_TOTAL.inc();
    }
}

/// Helper struct for recording API error responses
pub struct ApiMetrics;

impl ApiMetrics {
    pub fn record_error(code: &str) {
        API_ERRORS_TOTAL.with_label_values(&[code]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_metrics_recorded() {
        let before = RENDERS_TOTAL.with_label_values(&["success"]).get();
        RenderMetrics::record_success(Duration::from_millis(2));
        assert!(RENDERS_TOTAL.with_label_values(&["success"]).get() > before);
    }

    #[test]
    fn test_encode_metrics_contains_prefix() {
        ExportMetrics::record_failure("launch", Duration::from_millis(5));
        let output = encode_metrics().unwrap();
        assert!(output.contains("pwig_exports_total"));
    }
}
