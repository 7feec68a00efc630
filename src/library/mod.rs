//! Directory-backed template library.
//!
//! Every `<name>.twig` file in the templates directory is a template; its
//! sample variables live next to it in `<name>.twig.json`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;

/// Extension identifying template files
pub const TEMPLATE_EXTENSION: &str = ".twig";

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("invalid template name '{0}'")]
    InvalidName(String),

    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("failed to read template '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list templates in {dir}: {source}")]
    Listing {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::InvalidName(_) => {
                AppError::Validation("Invalid template name".to_string())
            }
            LibraryError::NotFound(name) => {
                AppError::NotFound(format!("Template '{}' not found", name))
            }
            e @ LibraryError::Io { .. } => AppError::internal("Unable to read template", e.to_string()),
            e @ LibraryError::Listing { .. } => {
                AppError::internal("Unable to read templates", e.to_string())
            }
        }
    }
}

/// A stored template and the raw text of its sample variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub content: String,
    /// JSON text, passed through unparsed
    pub variables: String,
}

pub struct TemplateLibrary {
    root: PathBuf,
}

impl TemplateLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of all templates, sorted.
    pub async fn list(&self) -> Result<Vec<String>, LibraryError> {
        let listing_error = |source| LibraryError::Listing {
            dir: self.root.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(listing_error)?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(listing_error)? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.ends_with(TEMPLATE_EXTENSION) {
                continue;
            }
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file() || t.is_symlink())
                .unwrap_or(false);
            if is_file {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Load a template and its variables file.
    pub async fn get(&self, name: &str) -> Result<TemplateDocument, LibraryError> {
        validate_name(name)?;

        let content = self.read(name, &self.root.join(name)).await?;
        let variables = self
            .read(name, &self.root.join(format!("{}.json", name)))
            .await?;

        Ok(TemplateDocument { content, variables })
    }

    async fn read(&self, name: &str, path: &Path) -> Result<String, LibraryError> {
        tokio::fs::read_to_string(path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                LibraryError::NotFound(name.to_string())
            } else {
                LibraryError::Io {
                    name: name.to_string(),
                    source,
                }
            }
        })
    }
}

/// Reject names that could escape the templates directory.
fn validate_name(name: &str) -> Result<(), LibraryError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);

    if invalid {
        Err(LibraryError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}
