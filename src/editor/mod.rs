//! Editor buffers for template text and variable JSON.
//!
//! The widgets themselves are out of scope; an editor is a text source that
//! reports every change to its listeners.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use thiserror::Error;

pub type ChangeCallback = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Invalid JSON format")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Cannot convert data to JSON")]
    Serialize(#[source] serde_json::Error),
}

/// Content language of an editor buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorLanguage {
    Twig,
    Json,
}

impl EditorLanguage {
    pub fn id(&self) -> &'static str {
        match self {
            EditorLanguage::Twig => "twig",
            EditorLanguage::Json => "json",
        }
    }

    /// Starter content shown in a fresh session
    pub fn default_content(&self) -> &'static str {
        match self {
            EditorLanguage::Twig => DEFAULT_TEMPLATE,
            EditorLanguage::Json => DEFAULT_VARIABLES,
        }
    }
}

const DEFAULT_TEMPLATE: &str = r#"<h1>{{ title }}</h1>
<p>Hello {{ user.name }}!</p>
<p>Email: {{ user.email }}</p>

<h2>Items:</h2>
<ul>
{% for item in items %}
  <li>{{ item }}</li>
{% endfor %}
</ul>"#;

const DEFAULT_VARIABLES: &str = r#"{
  "user": {
    "name": "John Doe",
    "email": "john@example.com"
  },
  "title": "Welcome",
  "items": ["Item 1", "Item 2", "Item 3"]
}"#;

/// An opaque text source that emits change notifications
pub trait TextSource: Send + Sync {
    fn get_value(&self) -> String;
    fn set_value(&self, value: &str);
    fn on_change(&self, callback: ChangeCallback);
}

pub struct EditorBuffer {
    language: EditorLanguage,
    value: Mutex<String>,
    listeners: Mutex<Vec<Arc<dyn Fn(&str) + Send + Sync>>>,
}

impl EditorBuffer {
    /// Buffer pre-filled with the language's default content
    pub fn new(language: EditorLanguage) -> Self {
        Self::with_value(language, language.default_content())
    }

    pub fn with_value(language: EditorLanguage, value: &str) -> Self {
        Self {
            language,
            value: Mutex::new(value.to_string()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn language(&self) -> EditorLanguage {
        self.language
    }

    pub fn is_valid_json(&self) -> bool {
        self.json_value().is_ok()
    }

    pub fn json_value(&self) -> Result<Value, EditorError> {
        serde_json::from_str(&self.get_value()).map_err(EditorError::InvalidJson)
    }

    /// Replace the content with pretty-printed `data`
    pub fn set_json(&self, data: &Value) -> Result<(), EditorError> {
        let text = serde_json::to_string_pretty(data).map_err(EditorError::Serialize)?;
        self.set_value(&text);
        Ok(())
    }

    /// Pretty-print JSON content in place; other content is left alone
    pub fn format(&self) {
        if self.language != EditorLanguage::Json {
            return;
        }
        if let Ok(data) = self.json_value() {
            let _ = self.set_json(&data);
        }
    }
}

impl TextSource for EditorBuffer {
    fn get_value(&self) -> String {
        self.value.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn set_value(&self, value: &str) {
        if let Ok(mut current) = self.value.lock() {
            if *current == value {
                return;
            }
            *current = value.to_string();
        }

        // Listeners run outside the locks so they may read the buffer
        let listeners: Vec<_> = self
            .listeners
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default();
        for listener in listeners {
            listener(value);
        }
    }

    fn on_change(&self, callback: ChangeCallback) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Arc::from(callback));
        }
    }
}
