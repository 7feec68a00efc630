//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use pwig::config::Settings;
use pwig::exporter::{EngineLauncher, EngineSession, ExportError, PdfOptions};
use pwig::server::AppState;

pub const PDF_MAGIC: &[u8] = b"%PDF-1.7\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFailure {
    None,
    Launch,
    Load,
    Capture,
    Release,
}

/// In-process engine: "prints" the loaded HTML behind a PDF header.
pub struct FakeEngine {
    failure: EngineFailure,
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new(failure: EngineFailure) -> Arc<Self> {
        Arc::new(Self {
            failure,
            launches: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineLauncher for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn launch(&self) -> Result<Box<dyn EngineSession>, ExportError> {
        if self.failure == EngineFailure::Launch {
            return Err(ExportError::Launch("no browser".into()));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            failure: self.failure,
            html: String::new(),
            closes: self.closes.clone(),
        }))
    }
}

struct FakeSession {
    failure: EngineFailure,
    html: String,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl EngineSession for FakeSession {
    async fn load_html(&mut self, html: &str) -> Result<(), ExportError> {
        if self.failure == EngineFailure::Load {
            return Err(ExportError::ContentLoad("page crashed".into()));
        }
        self.html = html.to_string();
        Ok(())
    }

    async fn capture_pdf(&mut self, _options: &PdfOptions) -> Result<Vec<u8>, ExportError> {
        if self.failure == EngineFailure::Capture {
            return Err(ExportError::Capture("printing failed".into()));
        }
        let mut bytes = PDF_MAGIC.to_vec();
        bytes.extend_from_slice(self.html.as_bytes());
        Ok(bytes)
    }

    async fn close(self: Box<Self>) -> Result<(), ExportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.failure == EngineFailure::Release {
            return Err(ExportError::Release("process already gone".into()));
        }
        Ok(())
    }
}

/// Settings reading templates from `templates_dir`
pub fn test_settings(templates_dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.server.host = "127.0.0.1".to_string();
    settings.templates.dir = templates_dir.to_path_buf();
    settings.preview.debounce_ms = 50;
    settings
}

pub fn test_state(templates_dir: &Path, engine: Arc<FakeEngine>) -> AppState {
    AppState::with_launcher(test_settings(templates_dir), engine)
}

/// Write a template and its variables file
pub fn write_template(dir: &Path, name: &str, content: &str, variables: &str) {
    std::fs::write(dir.join(name), content).unwrap();
    std::fs::write(dir.join(format!("{}.json", name)), variables).unwrap();
}

/// Preview display keeping every shown document
#[derive(Default)]
pub struct RecordingDisplay {
    shown: std::sync::Mutex<Vec<(String, bool)>>,
}

impl RecordingDisplay {
    pub fn shown(&self) -> Vec<(String, bool)> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl pwig::preview::PreviewDisplay for RecordingDisplay {
    async fn show(&self, html: &str, stale: bool) {
        self.shown.lock().unwrap().push((html.to_string(), stale));
    }
}
