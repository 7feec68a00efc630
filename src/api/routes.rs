use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::{export_pdf, get_template, health, index, list_templates, prometheus_metrics, render_template};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Index, health & metrics
        .route("/", get(index))
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api",
            Router::new()
                // Template library
                .route("/templates", get(list_templates))
                .route("/templates/{filename}", get(get_template))
                // Pipeline
                .route("/render", post(render_template))
                .route("/export", post(export_pdf)),
        )
}
