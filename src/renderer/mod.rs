//! Template rendering: (template text, variable context) -> HTML.
//!
//! Templates use a Twig-flavoured Jinja dialect:
//! - `{{ user.name }}` interpolation with attribute traversal
//! - `{% for item in items %}...{% else %}...{% endfor %}` loops
//! - `{% if %}` / `{% elif %}` (or Twig's `{% elseif %}`) / `{% else %}` conditionals
//! - `{% for key, value in mapping %}` pairs and inclusive `a..b` ranges
//!
//! Undefined lookups, including chained ones such as `{{ a.b.c }}`, and null
//! values render as the empty string. Rendering is all-or-nothing: a syntax or evaluation error
//! never yields partial output.
//!
//! # Example
//!
//! ```ignore
//! let renderer = TemplateRenderer::new();
//! let rendered = renderer.render("<h1>{{ title }}</h1>", &json!({"title": "Hi"}))?;
//! assert_eq!(rendered.html, "<h1>Hi</h1>");
//! ```

mod filters;
mod syntax;

use std::fmt;

use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use serde::Serialize;
use thiserror::Error;

use crate::config::RendererConfig;

/// Name reported in engine diagnostics for inline templates
const TEMPLATE_NAME: &str = "template";

/// Which phase of rendering failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderErrorKind {
    /// Malformed tags, unbalanced blocks, unknown statements
    Syntax,
    /// Failure while evaluating a well-formed template against its context
    Evaluation,
}

impl RenderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderErrorKind::Syntax => "syntax",
            RenderErrorKind::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for RenderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured rendering failure
#[derive(Debug, Clone, Error)]
#[error("{kind} error: {message}")]
pub struct RenderError {
    pub kind: RenderErrorKind,
    /// Human-readable description of the failure
    pub message: String,
    /// 1-based line in the template source, when known
    pub line: Option<usize>,
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::SyntaxError => RenderErrorKind::Syntax,
            _ => RenderErrorKind::Evaluation,
        };

        let message = match err.detail() {
            Some(detail) => format!("{}: {}", err.kind(), detail),
            None => err.kind().to_string(),
        };

        Self {
            kind,
            message,
            line: err.line(),
        }
    }
}

/// Successful render output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedHtml {
    pub html: String,
}

/// Stateless template renderer.
///
/// Holds only the configured engine environment (filters, escaping and
/// whitespace rules); every call compiles and evaluates its template from
/// scratch, so the renderer is reentrant and safe to share across requests.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a renderer with default settings (no escaping, Twig block trimming)
    pub fn new() -> Self {
        Self::with_config(&RendererConfig::default())
    }

    /// Create a renderer from configuration
    pub fn with_config(config: &RendererConfig) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(config.trim_blocks);

        let autoescape = config.autoescape;
        env.set_auto_escape_callback(move |_name| {
            if autoescape {
                AutoEscape::Html
            } else {
                AutoEscape::None
            }
        });
        env.set_formatter(|out, state, value| {
            if value.is_none() || value.is_undefined() {
                Ok(())
            } else {
                minijinja::escape_formatter(out, state, value)
            }
        });

        filters::register(&mut env);

        Self { env }
    }

    /// Render `template` against `variables`.
    pub fn render(
        &self,
        template: &str,
        variables: &serde_json::Value,
    ) -> Result<RenderedHtml, RenderError> {
        let source = syntax::normalize(template)?;
        let html = self
            .env
            .render_named_str(TEMPLATE_NAME, &source, variables)?;

        Ok(RenderedHtml { html })
    }
}
