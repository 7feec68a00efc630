use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub exporter: ExporterConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum accepted request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesConfig {
    /// Directory holding `*.twig` templates and their `<name>.json` variables
    #[serde(default = "default_templates_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    /// HTML-escape interpolated values
    #[serde(default)]
    pub autoescape: bool,
    /// Remove the first newline after a block tag (Twig semantics)
    #[serde(default = "default_trim_blocks")]
    pub trim_blocks: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    /// Path to the Chromium/Chrome binary; auto-detected when unset
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
    /// Keep the engine's process sandbox enabled.
    ///
    /// Containers without user namespaces usually need this set to `false`.
    #[serde(default = "default_sandbox")]
    pub sandbox: bool,
    /// Additional command line flags passed to the engine
    #[serde(default = "default_extra_args")]
    pub extra_args: Vec<String>,
    /// Maximum time to wait for the engine to start, in seconds
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_secs: u64,
    /// Maximum time to wait for loaded content to become quiescent, in seconds
    #[serde(default = "default_load_timeout")]
    pub load_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    /// Debounce delay between the last edit and the preview render, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024 // 10 MiB
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_trim_blocks() -> bool {
    true
}

fn default_sandbox() -> bool {
    true
}

fn default_extra_args() -> Vec<String> {
    vec!["--disable-dev-shm-usage".to_string()]
}

fn default_launch_timeout() -> u64 {
    20
}

fn default_load_timeout() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "pwig".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("templates.dir", "templates")?
            .set_default("exporter.load_timeout_secs", default_load_timeout() as i64)?
            .set_default("preview.debounce_ms", default_debounce_ms() as i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // PWIG_SERVER__PORT, PWIG_EXPORTER__SANDBOX, PWIG_SERVER__CORS_ORIGINS=a,b ...
            .add_source(
                Environment::with_prefix("PWIG")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .with_list_parse_key("exporter.extra_args"),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ExporterConfig {
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

impl PreviewConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            autoescape: false,
            trim_blocks: default_trim_blocks(),
        }
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            sandbox: default_sandbox(),
            extra_args: default_extra_args(),
            launch_timeout_secs: default_launch_timeout(),
            load_timeout_secs: default_load_timeout(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}
