//! Prometheus metrics for the render and export pipeline.
//!
//! - Render metrics (outcomes, duration)
//! - Export metrics (outcomes by failure stage, duration)
//! - Engine metrics (live instances, release failures)
//! - API error metrics

mod helpers;

pub use helpers::{encode_metrics, ApiMetrics, EngineMetrics, ExportMetrics, RenderMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "pwig";

lazy_static! {
    // ============================================================================
    // Render Metrics
    // ============================================================================

    /// Template renders by outcome (success, syntax, evaluation)
    pub static ref RENDERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_renders_total", METRIC_PREFIX),
        "Total template renders by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref RENDER_DURATION: Histogram = register_histogram!(
        format!("{}_render_duration_seconds", METRIC_PREFIX),
        "Template render duration in seconds",
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    ).unwrap();

    // ============================================================================
    // Export Metrics
    // ============================================================================

    /// PDF exports by outcome (success or the failing stage)
    pub static ref EXPORTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_exports_total", METRIC_PREFIX),
        "Total PDF exports by outcome",
        &["outcome"]
    ).unwrap();

    /// End-to-end export duration, engine launch included
    pub static ref EXPORT_DURATION: Histogram = register_histogram!(
        format!("{}_export_duration_seconds", METRIC_PREFIX),
        "PDF export duration in seconds",
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // ============================================================================
    // Engine Metrics
    // ============================================================================

    /// Engine instances currently launched and not yet released
    pub static ref ENGINE_INSTANCES_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_engine_instances_active", METRIC_PREFIX),
        "Number of rendering engine instances currently alive"
    ).unwrap();

    pub static ref ENGINE_RELEASE_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_engine_release_failures_total", METRIC_PREFIX),
        "Total failures while releasing a rendering engine instance"
    ).unwrap();

    // ============================================================================
    // API Metrics
    // ============================================================================

    pub static ref API_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_api_errors_total", METRIC_PREFIX),
        "Total API error responses by error code",
        &["code"]
    ).unwrap();
}
