mod settings;

pub use settings::{
    ExporterConfig, OtelConfig, PreviewConfig, RendererConfig, ServerConfig, Settings,
    TemplatesConfig,
};
