//! Editing session: two editors, a live preview, template selection and
//! PDF export against a Pwig API server.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::client::{ApiClient, ClientError};
use crate::config::PreviewConfig;
use crate::editor::{EditorBuffer, EditorLanguage, TextSource};
use crate::library::TEMPLATE_EXTENSION;
use crate::notify::{NotificationKind, NotificationSink};
use crate::preview::{LivePreview, PreviewDisplay, PreviewHandle, PreviewStats};

/// Client-side export name: `document-<UTC timestamp to seconds>.pdf`
pub fn document_filename(now: DateTime<Utc>) -> String {
    now.format("document-%Y-%m-%dT%H-%M-%S.pdf").to_string()
}

/// An entry of the template picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOption {
    pub name: String,
    pub label: String,
}

impl TemplateOption {
    fn new(name: String) -> Self {
        let label = name
            .strip_suffix(TEMPLATE_EXTENSION)
            .unwrap_or(&name)
            .to_string();
        Self { name, label }
    }
}

pub struct Workbench {
    template: Arc<EditorBuffer>,
    variables: Arc<EditorBuffer>,
    client: Arc<ApiClient>,
    notifier: Arc<dyn NotificationSink>,
    preview: PreviewHandle,
    preview_task: JoinHandle<PreviewStats>,
    selection: Option<String>,
    unsaved: Arc<AtomicBool>,
    downloads: PathBuf,
}

impl Workbench {
    /// Open a session with default editor content and render it right away.
    ///
    /// Exported PDFs are written into `downloads`. Must be called from within
    /// a tokio runtime.
    pub fn start(
        client: Arc<ApiClient>,
        display: Arc<dyn PreviewDisplay>,
        notifier: Arc<dyn NotificationSink>,
        config: &PreviewConfig,
        downloads: impl Into<PathBuf>,
    ) -> Self {
        let template = Arc::new(EditorBuffer::new(EditorLanguage::Twig));
        let variables = Arc::new(EditorBuffer::new(EditorLanguage::Json));

        let (preview, preview_task) = LivePreview::spawn(
            config.debounce(),
            template.clone(),
            variables.clone(),
            client.clone(),
            display,
            notifier.clone(),
        );

        let unsaved = Arc::new(AtomicBool::new(false));
        for editor in [&template, &variables] {
            let preview = preview.clone();
            let unsaved = unsaved.clone();
            editor.on_change(Box::new(move |_| {
                preview.notify_edit();
                unsaved.store(true, Ordering::SeqCst);
            }));
        }

        preview.render_now();

        Self {
            template,
            variables,
            client,
            notifier,
            preview,
            preview_task,
            selection: None,
            unsaved,
            downloads: downloads.into(),
        }
    }

    pub fn template_editor(&self) -> &Arc<EditorBuffer> {
        &self.template
    }

    pub fn variables_editor(&self) -> &Arc<EditorBuffer> {
        &self.variables
    }

    pub fn selected_template(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved.load(Ordering::SeqCst)
    }

    /// Ask for a fresh preview render
    pub fn refresh_preview(&self) {
        self.preview.render_now();
    }

    /// Templates available on the server; empty after a reported failure
    pub async fn load_templates(&self) -> Vec<TemplateOption> {
        match self.client.list_templates().await {
            Ok(names) => names.into_iter().map(TemplateOption::new).collect(),
            Err(e) => {
                self.report("Unable to load templates", &e);
                Vec::new()
            }
        }
    }

    /// Switch to another template.
    ///
    /// With unsaved edits, `confirm_discard` decides whether they may be
    /// thrown away. Returns whether the selection changed.
    pub async fn select_template(
        &mut self,
        name: &str,
        confirm_discard: impl FnOnce() -> bool,
    ) -> bool {
        if self.has_unsaved_changes() && !confirm_discard() {
            return false;
        }
        self.load_template(name).await
    }

    /// Replace both editors with a stored template and its variables.
    ///
    /// On failure the previous selection and editor content stay in place.
    pub async fn load_template(&mut self, name: &str) -> bool {
        match self.client.get_template(name).await {
            Ok(document) => {
                self.template.set_value(&document.content);
                self.variables.set_value(&document.variables);
                self.selection = Some(name.to_string());
                self.unsaved.store(false, Ordering::SeqCst);
                true
            }
            Err(e) => {
                self.report("Unable to load template", &e);
                false
            }
        }
    }

    /// Export the current editor content and save it into the downloads dir.
    pub async fn export_pdf(&self) -> Option<PathBuf> {
        let filename = document_filename(Utc::now());
        let template = self.template.get_value();
        let mut variables = self.variables.get_value();
        if variables.trim().is_empty() {
            variables = "{}".to_string();
        }

        let bytes = match self.client.export_pdf(&template, &variables, &filename).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.report("PDF export error", &e);
                return None;
            }
        };

        let path = self.downloads.join(&filename);
        if let Err(e) = save(&path, &bytes).await {
            tracing::error!(path = %path.display(), error = %e, "Unable to save exported PDF");
            self.notifier
                .show(&format!("Unable to save {}", filename), NotificationKind::Error);
            return None;
        }

        self.notifier.show(
            &format!("PDF exported successfully: {}", filename),
            NotificationKind::Success,
        );
        Some(path)
    }

    /// Stop the live preview and return its statistics
    pub async fn shutdown(self) -> PreviewStats {
        self.preview.shutdown();
        match self.preview_task.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "Live preview task failed");
                PreviewStats::default()
            }
        }
    }

    fn report(&self, context: &str, err: &ClientError) {
        tracing::warn!(error = %err, "{}", context);
        self.notifier.show(&err.user_message(), NotificationKind::Error);
    }
}

async fn save(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}
