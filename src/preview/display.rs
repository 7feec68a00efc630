use std::path::PathBuf;

use async_trait::async_trait;

use super::PreviewDisplay;

/// Wrap a rendered fragment in the standalone document used for previews
pub fn preview_document(html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="UTF-8">
    <style>
      body {{
        margin: 20px;
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        line-height: 1.6;
        color: #333;
      }}
      * {{
        box-sizing: border-box;
      }}
    </style>
  </head>
  <body>
{}
  </body>
</html>
"#,
        html
    )
}

/// Writes each preview to an HTML file, e.g. for a browser with auto-reload
pub struct FileDisplay {
    path: PathBuf,
}

impl FileDisplay {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PreviewDisplay for FileDisplay {
    async fn show(&self, html: &str, stale: bool) {
        if let Err(e) = tokio::fs::write(&self.path, preview_document(html)).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Unable to write preview");
            return;
        }
        tracing::debug!(path = %self.path.display(), stale, "Preview updated");
    }
}
