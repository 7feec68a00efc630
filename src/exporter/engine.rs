//! Engine abstraction for HTML to PDF materialization.
//!
//! An [`EngineLauncher`] produces one fresh [`EngineSession`] per export. A
//! session is used for exactly one document and then consumed by
//! [`EngineSession::close`]; sessions are never pooled or reused.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::PdfOptions;

/// Errors raised while exporting a document.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Engine binary missing, crashed on start, or refused the configuration
    #[error("engine launch failed: {0}")]
    Launch(String),

    #[error("engine launch timed out after {0:?}")]
    LaunchTimeout(Duration),

    /// Page creation or content injection failed
    #[error("content load failed: {0}")]
    ContentLoad(String),

    /// Content did not become quiescent in time
    #[error("content load timed out after {0:?}")]
    LoadTimeout(Duration),

    #[error("PDF capture failed: {0}")]
    Capture(String),

    /// Only ever logged by the exporter, never returned from an export
    #[error("engine release failed: {0}")]
    Release(String),

    /// The export task panicked or was cancelled by the runtime
    #[error("export task aborted: {0}")]
    Aborted(String),
}

impl ExportError {
    /// Stage label used in logs and metrics
    pub fn stage(&self) -> &'static str {
        match self {
            ExportError::Launch(_) | ExportError::LaunchTimeout(_) => "launch",
            ExportError::ContentLoad(_) => "content_load",
            ExportError::LoadTimeout(_) => "load_timeout",
            ExportError::Capture(_) => "capture",
            ExportError::Release(_) => "release",
            ExportError::Aborted(_) => "aborted",
        }
    }
}

/// Starts engine instances.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &'static str;

    /// Start a fresh, isolated engine instance.
    async fn launch(&self) -> Result<Box<dyn EngineSession>, ExportError>;
}

/// A live engine instance owned by a single export.
#[async_trait]
pub trait EngineSession: Send {
    /// Load `html` and wait until the document is quiescent: parsing done,
    /// fonts ready and every image loaded or failed.
    async fn load_html(&mut self, html: &str) -> Result<(), ExportError>;

    /// Print the loaded document to PDF bytes.
    async fn capture_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, ExportError>;

    /// Release every resource held by the instance.
    async fn close(self: Box<Self>) -> Result<(), ExportError>;
}
