//! Template library endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::Result;
use crate::library::TemplateDocument;
use crate::server::AppState;

/// GET /api/templates - List template file names, sorted
#[tracing::instrument(name = "http.list_templates", skip(state))]
pub async fn list_templates(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let names = state.library.list().await?;
    Ok(Json(names))
}

/// GET /api/templates/{filename} - Template content and its sample variables
#[tracing::instrument(name = "http.get_template", skip(state))]
pub async fn get_template(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<TemplateDocument>> {
    let document = state.library.get(&filename).await?;
    Ok(Json(document))
}
