//! Headless Chromium engine driven over the DevTools protocol.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{EngineLauncher, EngineSession, ExportError, PdfOptions};
use crate::config::ExporterConfig;

/// Resolves once the document, its web fonts and all of its images settled
const QUIESCENCE_SCRIPT: &str = r#"
(async () => {
  if (document.readyState !== "complete") {
    await new Promise((resolve) => window.addEventListener("load", resolve, { once: true }));
  }
  if (document.fonts && document.fonts.ready) {
    await document.fonts.ready;
  }
  await Promise.all(
    Array.from(document.images)
      .filter((img) => !img.complete)
      .map((img) => new Promise((resolve) => {
        img.addEventListener("load", resolve, { once: true });
        img.addEventListener("error", resolve, { once: true });
      }))
  );
  return true;
})()
"#;

/// Launches one isolated headless Chromium process per export.
pub struct ChromiumLauncher {
    config: ExporterConfig,
}

impl ChromiumLauncher {
    pub fn new(config: ExporterConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig, ExportError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .launch_timeout(self.config.launch_timeout())
            .args(self.config.extra_args.iter().map(String::as_str));

        if let Some(executable) = &self.config.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        if !self.config.sandbox {
            builder = builder.no_sandbox();
        }

        builder.build().map_err(ExportError::Launch)
    }
}

#[async_trait]
impl EngineLauncher for ChromiumLauncher {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn launch(&self) -> Result<Box<dyn EngineSession>, ExportError> {
        // A private profile per instance keeps concurrent exports apart.
        // Dropped with this future if the launch is abandoned.
        let profile_dir = ProfileDir::new();
        let config = self.browser_config(profile_dir.path())?;

        let (browser, mut handler) = match Browser::launch(config).await {
            Ok(launched) => launched,
            Err(e) => {
                profile_dir.remove().await;
                return Err(ExportError::Launch(e.to_string()));
            }
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::debug!(profile = %profile_dir.path().display(), "Chromium instance launched");

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
            page: None,
            profile_dir,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Option<Page>,
    profile_dir: ProfileDir,
}

#[async_trait]
impl EngineSession for ChromiumSession {
    async fn load_html(&mut self, html: &str) -> Result<(), ExportError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ExportError::ContentLoad(e.to_string()))?;

        page.set_content(html)
            .await
            .map_err(|e| ExportError::ContentLoad(e.to_string()))?;

        let wait = EvaluateParams::builder()
            .expression(QUIESCENCE_SCRIPT)
            .await_promise(true)
            .build()
            .map_err(ExportError::ContentLoad)?;
        page.evaluate_expression(wait)
            .await
            .map_err(|e| ExportError::ContentLoad(e.to_string()))?;

        self.page = Some(page);
        Ok(())
    }

    async fn capture_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, ExportError> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| ExportError::Capture("no document loaded".to_string()))?;

        page.pdf(print_params(options))
            .await
            .map_err(|e| ExportError::Capture(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), ExportError> {
        let ChromiumSession {
            mut browser,
            handler_task,
            page,
            profile_dir,
        } = *self;
        drop(page);

        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| ExportError::Release(e.to_string()));
        // Reap the process even when the close command failed
        let waited = browser
            .wait()
            .await
            .map(|_| ())
            .map_err(|e| ExportError::Release(e.to_string()));

        handler_task.abort();
        profile_dir.remove().await;

        closed.and(waited)
    }
}

fn print_params(options: &PdfOptions) -> PrintToPdfParams {
    let (width, height) = options.format.dimensions();

    PrintToPdfParams {
        landscape: Some(options.landscape),
        print_background: Some(options.print_background),
        scale: Some(options.scale),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(options.margin.top),
        margin_bottom: Some(options.margin.bottom),
        margin_left: Some(options.margin.left),
        margin_right: Some(options.margin.right),
        prefer_css_page_size: Some(options.prefer_css_page_size),
        ..Default::default()
    }
}

/// Temporary browser profile directory, removed on [`remove`](Self::remove)
/// or, failing that, on drop
struct ProfileDir {
    path: PathBuf,
    removed: bool,
}

impl ProfileDir {
    fn new() -> Self {
        Self::at(std::env::temp_dir().join(format!("pwig-engine-{}", Uuid::new_v4())))
    }

    fn at(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn remove(mut self) {
        log_removal(&self.path, tokio::fs::remove_dir_all(&self.path).await);
        self.removed = true;
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if !self.removed {
            log_removal(&self.path, std::fs::remove_dir_all(&self.path));
        }
    }
}

fn log_removal(dir: &Path, result: std::io::Result<()>) {
    if let Err(e) = result {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(profile = %dir.display(), error = %e, "Failed to remove engine profile");
        }
    }
}
