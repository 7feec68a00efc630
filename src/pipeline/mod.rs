//! Render and export pipeline.
//!
//! Validates incoming requests, runs the template renderer and the document
//! exporter, and normalizes every downstream failure into [`AppError`].

mod types;
pub mod validation;

pub use types::{ExportRequest, ExportedDocument, RenderRequest, RenderResponse};

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::error::AppError;
use crate::exporter::{DocumentExporter, PdfOptions};
use crate::metrics::RenderMetrics;
use crate::renderer::{RenderError, TemplateRenderer};

/// Server-side fallback export name: `template-<epoch millis>.pdf`
pub fn default_export_filename() -> String {
    format!("template-{}.pdf", Utc::now().timestamp_millis())
}

pub struct PipelineService {
    renderer: Arc<TemplateRenderer>,
    exporter: DocumentExporter,
}

impl PipelineService {
    pub fn new(renderer: TemplateRenderer, exporter: DocumentExporter) -> Self {
        Self {
            renderer: Arc::new(renderer),
            exporter,
        }
    }

    /// Name of the engine backing exports
    pub fn engine_name(&self) -> &'static str {
        self.exporter.engine_name()
    }

    /// Validate and render a template to HTML.
    #[tracing::instrument(name = "pipeline.render", skip(self, request))]
    pub async fn render_template(
        &self,
        request: &RenderRequest,
    ) -> Result<RenderResponse, AppError> {
        let template = validation::require_template(request.template.as_deref())?;
        let variables = validation::parse_variables(request.variables.as_ref())?;

        let html = self.render(template, variables).await?;
        Ok(RenderResponse { html })
    }

    /// Validate, render, and materialize a template as a PDF.
    #[tracing::instrument(
        name = "pipeline.export",
        skip(self, request),
        fields(filename = tracing::field::Empty)
    )]
    pub async fn export_document(
        &self,
        request: &ExportRequest,
    ) -> Result<ExportedDocument, AppError> {
        let template = validation::require_template(request.template.as_deref())?;
        let variables = validation::parse_variables(request.variables.as_ref())?;

        let options = request.options.clone().unwrap_or_default();
        options
            .validate()
            .map_err(|e| AppError::Validation(format!("Invalid PDF options: {}", e)))?;

        let filename = match request.filename.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_export_filename(),
        };
        tracing::Span::current().record("filename", filename.as_str());

        let html = self.render(template, variables).await?;
        let bytes = self.export_html(&html, &options).await?;

        Ok(ExportedDocument { bytes, filename })
    }

    /// Evaluation runs on the blocking pool
    async fn render(&self, template: &str, variables: serde_json::Value) -> Result<String, AppError> {
        let renderer = self.renderer.clone();
        let template = template.to_string();
        let started = Instant::now();

        let outcome = tokio::task::spawn_blocking(move || renderer.render(&template, &variables))
            .await
            .map_err(|e| AppError::internal("Unable to render template", e.to_string()))?;

        match outcome {
            Ok(rendered) => {
                RenderMetrics::record_success(started.elapsed());
                Ok(rendered.html)
            }
            Err(e) => {
                RenderMetrics::record_failure(e.kind.as_str(), started.elapsed());
                Err(render_failure(e))
            }
        }
    }

    async fn export_html(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, AppError> {
        self.exporter
            .export(html, options)
            .await
            .map_err(|e| AppError::Export(format!("{} ({})", e, e.stage())))
    }
}

fn render_failure(err: RenderError) -> AppError {
    let detail = match err.line {
        Some(line) => format!("{} (line {})", err, line),
        None => err.to_string(),
    };
    AppError::Render(detail)
}
