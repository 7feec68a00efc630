//! Prometheus scrape endpoint.

use axum::{http::header, response::IntoResponse};

use crate::error::{AppError, Result};
use crate::metrics;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics - render, export and engine metrics in text exposition format
pub async fn prometheus_metrics() -> Result<impl IntoResponse> {
    let body = metrics::encode_metrics()
        .map_err(|e| AppError::internal("Unable to encode metrics", e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body))
}
