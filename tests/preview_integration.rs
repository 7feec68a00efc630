//! Live preview timing tests on a paused tokio clock.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use common::RecordingDisplay;
use pwig::client::ClientError;
use pwig::editor::{EditorBuffer, EditorLanguage, TextSource};
use pwig::notify::{NotificationKind, RecordingNotifier};
use pwig::preview::{LivePreview, PreviewBackend, PreviewHandle, PreviewStats};

struct FakeBackend {
    delay: Duration,
    fail: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeBackend {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            fail: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PreviewBackend for FakeBackend {
    async fn render(&self, template: &str, variables: &str) -> Result<String, ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push((template.to_string(), variables.to_string()));
        sleep(self.delay).await;

        if self.fail {
            return Err(ClientError::Api("Unable to render template".into()));
        }
        Ok(format!("rendered:{}", template))
    }
}

struct Session {
    template: Arc<EditorBuffer>,
    variables: Arc<EditorBuffer>,
    display: Arc<RecordingDisplay>,
    notifier: Arc<RecordingNotifier>,
    handle: PreviewHandle,
    task: JoinHandle<PreviewStats>,
}

impl Session {
    fn start(debounce: Duration, backend: Arc<FakeBackend>) -> Self {
        let template = Arc::new(EditorBuffer::with_value(EditorLanguage::Twig, "v0"));
        let variables = Arc::new(EditorBuffer::with_value(EditorLanguage::Json, "{}"));
        let display = Arc::new(RecordingDisplay::default());
        let notifier = Arc::new(RecordingNotifier::new());

        let (handle, task) = LivePreview::spawn(
            debounce,
            template.clone(),
            variables.clone(),
            backend,
            display.clone(),
            notifier.clone(),
        );
        for editor in [&template, &variables] {
            let handle = handle.clone();
            editor.on_change(Box::new(move |_| handle.notify_edit()));
        }

        Self {
            template,
            variables,
            display,
            notifier,
            handle,
            task,
        }
    }

    async fn stop(self) -> PreviewStats {
        self.handle.shutdown();
        self.task.await.unwrap()
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_edits_renders_once() {
    let backend = FakeBackend::new(ms(100));
    let session = Session::start(ms(500), backend.clone());

    for i in 1..=5 {
        session.template.set_value(&format!("v{}", i));
        sleep(ms(100)).await;
    }
    assert!(backend.calls().is_empty());

    sleep(ms(2000)).await;

    assert_eq!(backend.calls(), vec![("v5".to_string(), "{}".to_string())]);
    assert_eq!(session.display.shown(), vec![("rendered:v5".to_string(), false)]);

    let stats = session.stop().await;
    assert_eq!(stats.edits, 5);
    assert_eq!(stats.renders, 1);
    assert_eq!(stats.dropped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_render_before_debounce_elapses() {
    let backend = FakeBackend::new(ms(10));
    let session = Session::start(ms(500), backend.clone());

    session.template.set_value("v1");
    sleep(ms(499)).await;
    assert!(backend.calls().is_empty());

    sleep(ms(2)).await;
    assert_eq!(backend.calls().len(), 1);

    session.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_render_is_dropped() {
    let backend = FakeBackend::new(ms(1000));
    let session = Session::start(ms(100), backend.clone());

    // render starts at 100ms and settles at 1100ms
    session.template.set_value("v1");
    sleep(ms(300)).await;
    // due at 400ms, while the first render is still running
    session.template.set_value("v2");
    sleep(ms(3000)).await;

    assert_eq!(backend.calls().len(), 1);
    assert_eq!(session.display.shown(), vec![("rendered:v1".to_string(), true)]);

    // the next edit starts a fresh cycle
    session.template.set_value("v3");
    sleep(ms(1500)).await;

    let calls: Vec<_> = backend.calls().into_iter().map(|(t, _)| t).collect();
    assert_eq!(calls, vec!["v1", "v3"]);

    let stats = session.stop().await;
    assert_eq!(stats.renders, 2);
    assert_eq!(stats.dropped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_render_survives_when_render_settles_first() {
    let backend = FakeBackend::new(ms(200));
    let session = Session::start(ms(500), backend.clone());

    // render runs 500ms..700ms
    session.template.set_value("v1");
    sleep(ms(600)).await;
    // due at 1100ms, after the render settled
    session.template.set_value("v2");
    sleep(ms(2000)).await;

    let calls: Vec<_> = backend.calls().into_iter().map(|(t, _)| t).collect();
    assert_eq!(calls, vec!["v1", "v2"]);
    assert_eq!(
        session.display.shown(),
        vec![
            ("rendered:v1".to_string(), true),
            ("rendered:v2".to_string(), false)
        ]
    );

    let stats = session.stop().await;
    assert_eq!(stats.dropped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_render_now_is_single_flight() {
    let backend = FakeBackend::new(ms(500));
    let session = Session::start(ms(100), backend.clone());

    session.handle.render_now();
    sleep(ms(10)).await;
    session.handle.render_now();
    sleep(ms(10)).await;
    assert_eq!(backend.calls().len(), 1);

    sleep(ms(1000)).await;
    let stats = session.stop().await;
    assert_eq!(stats.renders, 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_variables_sent_as_empty_object() {
    let backend = FakeBackend::new(ms(10));
    let session = Session::start(ms(100), backend.clone());

    session.variables.set_value("   ");
    sleep(ms(500)).await;

    assert_eq!(backend.calls(), vec![("v0".to_string(), "{}".to_string())]);
    session.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_render_failure_is_notified() {
    let backend = FakeBackend::failing(ms(50));
    let session = Session::start(ms(100), backend.clone());

    session.template.set_value("{% if %}");
    sleep(ms(1000)).await;

    assert!(session.display.shown().is_empty());
    assert_eq!(
        session.notifier.messages(NotificationKind::Error),
        vec!["Unable to render template"]
    );

    let stats = session.stop().await;
    assert_eq!(stats.failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_in_flight_render() {
    let backend = FakeBackend::new(ms(800));
    let session = Session::start(ms(100), backend.clone());

    session.handle.render_now();
    sleep(ms(10)).await;

    let display = session.display.clone();
    let stats = session.stop().await;

    assert_eq!(stats.renders, 1);
    assert_eq!(display.shown(), vec![("rendered:v0".to_string(), false)]);
}
