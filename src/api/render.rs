//! Template render endpoint.

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::error::Result;
use crate::pipeline::{RenderRequest, RenderResponse};
use crate::server::AppState;

/// POST /api/render - Render a template to HTML
#[tracing::instrument(
    name = "http.render_template",
    skip(state, request),
    fields(template_len = tracing::field::Empty)
)]
pub async fn render_template(
    State(state): State<AppState>,
    request: std::result::Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Json<RenderResponse>> {
    let Json(request) = request?;
    if let Some(template) = &request.template {
        tracing::Span::current().record("template_len", template.len());
    }

    let response = state.pipeline.render_template(&request).await?;
    Ok(Json(response))
}
