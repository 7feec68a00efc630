//! API layer - HTTP endpoint handlers.

mod export;
mod health;
mod metrics;
mod render;
mod routes;
mod templates;

pub use export::export_pdf;
pub use health::{health, index, HealthResponse, IndexResponse};
pub use metrics::prometheus_metrics;
pub use render::render_template;
pub use routes::api_routes;
pub use templates::{get_template, list_templates};
