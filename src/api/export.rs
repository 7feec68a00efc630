//! PDF export endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::Result;
use crate::pipeline::ExportRequest;
use crate::server::AppState;

/// POST /api/export - Render a template and download it as a PDF
#[tracing::instrument(name = "http.export_pdf", skip(state, request))]
pub async fn export_pdf(
    State(state): State<AppState>,
    request: std::result::Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = request?;
    let document = state.pipeline.export_document(&request).await?;

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/pdf"),
        ),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(&document.filename),
        ),
    ];

    Ok((StatusCode::OK, headers, document.bytes).into_response())
}

/// `attachment; filename=<name>` with control characters removed
fn content_disposition(filename: &str) -> HeaderValue {
    let safe: String = filename.chars().filter(|c| !c.is_control()).collect();
    let value = format!("attachment; filename={}", safe);

    HeaderValue::from_bytes(value.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
