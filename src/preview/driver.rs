//! Tokio driver feeding real time and edit events into the scheduler.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, Duration, Instant};

use super::scheduler::{PreviewStats, RenderScheduler, RenderTicket, TimerOutcome};
use crate::client::{ApiClient, ClientError};
use crate::editor::TextSource;
use crate::notify::{NotificationKind, NotificationSink};

/// Renders preview HTML
#[async_trait]
pub trait PreviewBackend: Send + Sync {
    async fn render(&self, template: &str, variables: &str) -> Result<String, ClientError>;
}

#[async_trait]
impl PreviewBackend for ApiClient {
    async fn render(&self, template: &str, variables: &str) -> Result<String, ClientError> {
        ApiClient::render(self, template, variables).await
    }
}

/// Receives rendered previews
#[async_trait]
pub trait PreviewDisplay: Send + Sync {
    /// `stale` is set when the inputs changed while this render was running
    async fn show(&self, html: &str, stale: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PreviewCommand {
    Edit,
    RenderNow,
    Shutdown,
}

/// Cheap handle for talking to a running [`LivePreview`]
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    commands: mpsc::UnboundedSender<PreviewCommand>,
}

impl PreviewHandle {
    /// Report that the template or the variables changed
    pub fn notify_edit(&self) {
        let _ = self.commands.send(PreviewCommand::Edit);
    }

    /// Render immediately unless a render is already in flight
    pub fn render_now(&self) {
        let _ = self.commands.send(PreviewCommand::RenderNow);
    }

    /// Stop the driver once the in-flight render, if any, settles
    pub fn shutdown(&self) {
        let _ = self.commands.send(PreviewCommand::Shutdown);
    }
}

struct InFlight {
    ticket: RenderTicket,
    task: JoinHandle<Result<String, ClientError>>,
}

pub struct LivePreview {
    scheduler: RenderScheduler,
    template: Arc<dyn TextSource>,
    variables: Arc<dyn TextSource>,
    backend: Arc<dyn PreviewBackend>,
    display: Arc<dyn PreviewDisplay>,
    notifier: Arc<dyn NotificationSink>,
    commands: mpsc::UnboundedReceiver<PreviewCommand>,
}

impl LivePreview {
    /// Start the driver on the current runtime.
    ///
    /// The returned task resolves to the session statistics after
    /// [`PreviewHandle::shutdown`] or once every handle is dropped.
    pub fn spawn(
        debounce: Duration,
        template: Arc<dyn TextSource>,
        variables: Arc<dyn TextSource>,
        backend: Arc<dyn PreviewBackend>,
        display: Arc<dyn PreviewDisplay>,
        notifier: Arc<dyn NotificationSink>,
    ) -> (PreviewHandle, JoinHandle<PreviewStats>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Self {
            scheduler: RenderScheduler::new(debounce),
            template,
            variables,
            backend,
            display,
            notifier,
            commands: rx,
        };

        (PreviewHandle { commands: tx }, tokio::spawn(driver.run()))
    }

    async fn run(mut self) -> PreviewStats {
        let mut in_flight: Option<InFlight> = None;
        let mut closed = false;

        loop {
            let deadline = self.scheduler.deadline();

            tokio::select! {
                command = self.commands.recv(), if !closed => match command {
                    Some(PreviewCommand::Edit) => self.scheduler.on_edit(Instant::now()),
                    Some(PreviewCommand::RenderNow) => {
                        if let Some(ticket) = self.scheduler.start_now() {
                            in_flight = Some(self.start_render(ticket));
                        }
                    }
                    Some(PreviewCommand::Shutdown) | None => closed = true,
                },
                _ = sleep_until(deadline.unwrap_or_else(far_future)), if deadline.is_some() && !closed => {
                    match self.scheduler.on_timer(Instant::now()) {
                        TimerOutcome::Render(ticket) => in_flight = Some(self.start_render(ticket)),
                        TimerOutcome::Dropped => {
                            tracing::debug!("Preview render skipped, previous render still in flight");
                        }
                        TimerOutcome::NotDue => {}
                    }
                }
                (ticket, result) = next_settled(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    self.finish_render(ticket, result).await;
                }
            }

            if closed && in_flight.is_none() {
                break;
            }
        }

        let stats = self.scheduler.stats();
        tracing::debug!(
            edits = stats.edits,
            renders = stats.renders,
            dropped = stats.dropped,
            failures = stats.failures,
            "Live preview stopped"
        );
        stats
    }

    fn start_render(&self, ticket: RenderTicket) -> InFlight {
        let template = self.template.get_value();
        let mut variables = self.variables.get_value();
        if variables.trim().is_empty() {
            variables = "{}".to_string();
        }

        let backend = self.backend.clone();
        let task = tokio::spawn(async move { backend.render(&template, &variables).await });

        InFlight { ticket, task }
    }

    async fn finish_render(
        &mut self,
        ticket: RenderTicket,
        result: Result<Result<String, ClientError>, JoinError>,
    ) {
        let settled = self.scheduler.on_settled(ticket);

        match result {
            Ok(Ok(html)) => self.display.show(&html, settled.stale).await,
            Ok(Err(e)) => {
                self.scheduler.record_failure();
                tracing::warn!(error = %e, "Unable to render preview");
                self.notifier.show(&e.user_message(), NotificationKind::Error);
            }
            Err(e) => {
                self.scheduler.record_failure();
                tracing::error!(error = %e, "Preview render task failed");
                self.notifier
                    .show(crate::client::UNKNOWN_ERROR_MESSAGE, NotificationKind::Error);
            }
        }
    }
}

async fn next_settled(
    slot: &mut Option<InFlight>,
) -> (RenderTicket, Result<Result<String, ClientError>, JoinError>) {
    match slot {
        Some(in_flight) => {
            let result = (&mut in_flight.task).await;
            (in_flight.ticket, result)
        }
        None => std::future::pending().await,
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365)
}
