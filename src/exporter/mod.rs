//! HTML to PDF export.
//!
//! [`DocumentExporter`] drives one engine instance per call through
//! launch, load, capture and release. Release runs on every exit path once
//! launch has succeeded, and a release failure is logged without replacing
//! the export's own outcome.
//!
//! Each export runs in its own task. Dropping the caller's future (client
//! disconnect, outer timeout) detaches that task instead of cancelling it, so
//! the engine is still released.

mod chromium;
mod engine;
mod options;

pub use chromium::ChromiumLauncher;
pub use engine::{EngineLauncher, EngineSession, ExportError};
pub use options::{PaperFormat, PdfMargin, PdfOptions};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;

use crate::config::ExporterConfig;
use crate::metrics::{EngineMetrics, ExportMetrics};

/// Exports HTML documents to PDF through a pluggable engine.
pub struct DocumentExporter {
    launcher: Arc<dyn EngineLauncher>,
    launch_timeout: Duration,
    load_timeout: Duration,
}

impl DocumentExporter {
    pub fn new(launcher: Arc<dyn EngineLauncher>, config: &ExporterConfig) -> Self {
        Self {
            launcher,
            launch_timeout: config.launch_timeout(),
            load_timeout: config.load_timeout(),
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.launcher.name()
    }

    /// Export `html` to PDF bytes with the given layout options.
    #[tracing::instrument(
        name = "exporter.export",
        skip(self, html, options),
        fields(engine = self.launcher.name(), html_len = html.len())
    )]
    pub async fn export(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, ExportError> {
        let started = Instant::now();
        let result = self.run(html, options).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(bytes) => {
                ExportMetrics::record_success(elapsed);
                tracing::info!(
                    bytes = bytes.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "PDF exported"
                );
            }
            Err(e) => {
                ExportMetrics::record_failure(e.stage(), elapsed);
                tracing::warn!(stage = e.stage(), error = %e, "PDF export failed");
            }
        }

        result
    }

    async fn run(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, ExportError> {
        let lifecycle = EngineLifecycle {
            launcher: self.launcher.clone(),
            launch_timeout: self.launch_timeout,
            load_timeout: self.load_timeout,
        };
        let html = html.to_string();
        let options = options.clone();

        let task = tokio::spawn(
            async move { lifecycle.run(&html, &options).await }.instrument(tracing::Span::current()),
        );

        task.await.map_err(|e| ExportError::Aborted(e.to_string()))?
    }
}

/// Everything one export needs, owned so it can outlive the caller
struct EngineLifecycle {
    launcher: Arc<dyn EngineLauncher>,
    launch_timeout: Duration,
    load_timeout: Duration,
}

impl EngineLifecycle {
    async fn run(self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, ExportError> {
        let mut session = tokio::time::timeout(self.launch_timeout, self.launcher.launch())
            .await
            .map_err(|_| ExportError::LaunchTimeout(self.launch_timeout))??;
        EngineMetrics::record_launched();

        let outcome = self.render_in(session.as_mut(), html, options).await;

        if let Err(e) = session.close().await {
            EngineMetrics::record_release_failure();
            tracing::warn!(error = %e, "Failed to release engine instance");
        }
        EngineMetrics::record_released();

        outcome
    }

    async fn render_in(
        &self,
        session: &mut dyn EngineSession,
        html: &str,
        options: &PdfOptions,
    ) -> Result<Vec<u8>, ExportError> {
        tokio::time::timeout(self.load_timeout, session.load_html(html))
            .await
            .map_err(|_| ExportError::LoadTimeout(self.load_timeout))??;

        let bytes = session.capture_pdf(options).await?;
        if bytes.is_empty() {
            return Err(ExportError::Capture("engine returned an empty document".to_string()));
        }

        Ok(bytes)
    }
}

/// Create the engine launcher used in production.
pub fn create_launcher(config: &ExporterConfig) -> Arc<dyn EngineLauncher> {
    tracing::info!(
        engine = "chromium",
        sandbox = config.sandbox,
        executable = ?config.chrome_executable,
        "Creating document engine launcher"
    );
    Arc::new(ChromiumLauncher::new(config.clone()))
}
