//! User-facing notifications.
//!
//! Components report outcomes through an injected [`NotificationSink`] rather
//! than a global toast manager; the embedding UI decides how to show them.

use std::sync::Mutex;
use std::time::Duration;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
    /// Sticky until replaced; never auto-dismissed
    Loading,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
            NotificationKind::Loading => "loading",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastPosition {
    TopLeft,
    TopRight,
    TopCenter,
    BottomLeft,
    #[default]
    BottomRight,
    BottomCenter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOptions {
    /// Auto-dismiss delay; `None` keeps the notification until dismissed
    pub duration: Option<Duration>,
    pub dismissible: bool,
    pub position: ToastPosition,
}

impl NotifyOptions {
    /// Defaults for `kind`: errors linger 5s, loading is sticky, the rest 3s
    pub fn for_kind(kind: NotificationKind) -> Self {
        let duration = match kind {
            NotificationKind::Error => Some(Duration::from_secs(5)),
            NotificationKind::Loading => None,
            _ => Some(Duration::from_secs(3)),
        };

        Self {
            duration,
            dismissible: true,
            position: ToastPosition::default(),
        }
    }
}

/// Receives user-facing notifications
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str, kind: NotificationKind, options: &NotifyOptions);

    /// Notify with the default options for `kind`
    fn show(&self, message: &str, kind: NotificationKind) {
        self.notify(message, kind, &NotifyOptions::for_kind(kind));
    }
}

/// Writes notifications to the tracing log
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, message: &str, kind: NotificationKind, _options: &NotifyOptions) {
        match kind {
            NotificationKind::Error => tracing::error!(kind = kind.as_str(), "{}", message),
            NotificationKind::Warning => tracing::warn!(kind = kind.as_str(), "{}", message),
            _ => tracing::info!(kind = kind.as_str(), "{}", message),
        }
    }
}

/// A delivered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub options: NotifyOptions,
}

/// Keeps every notification in memory, for headless sessions and tests
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    /// Messages of the given kind, in delivery order
    pub fn messages(&self, kind: NotificationKind) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.message)
            .collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, message: &str, kind: NotificationKind, options: &NotifyOptions) {
        if let Ok(mut list) = self.delivered.lock() {
            list.push(Notification {
                message: message.to_string(),
                kind,
                options: options.clone(),
            });
        }
    }
}
