use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::exporter::{create_launcher, DocumentExporter, EngineLauncher};
use crate::library::TemplateLibrary;
use crate::pipeline::PipelineService;
use crate::renderer::TemplateRenderer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub pipeline: Arc<PipelineService>,
    pub library: Arc<TemplateLibrary>,
    pub start_time: Instant,
}

impl AppState {
    /// Production state exporting through headless Chromium
    pub fn new(settings: Settings) -> Self {
        let launcher = create_launcher(&settings.exporter);
        Self::with_launcher(settings, launcher)
    }

    /// State exporting through the given engine
    pub fn with_launcher(settings: Settings, launcher: Arc<dyn EngineLauncher>) -> Self {
        let renderer = TemplateRenderer::with_config(&settings.renderer);
        let exporter = DocumentExporter::new(launcher, &settings.exporter);
        let library = Arc::new(TemplateLibrary::new(settings.templates.dir.clone()));

        Self {
            settings: Arc::new(settings),
            pipeline: Arc::new(PipelineService::new(renderer, exporter)),
            library,
            start_time: Instant::now(),
        }
    }
}
