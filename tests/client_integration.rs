//! Client and workbench tests against a loopback API server.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use common::{test_settings, test_state, write_template, EngineFailure, FakeEngine, RecordingDisplay, PDF_MAGIC};
use pwig::client::{ApiClient, ClientError};
use pwig::editor::TextSource;
use pwig::notify::{NotificationKind, RecordingNotifier};
use pwig::server::create_app;
use pwig::workbench::Workbench;

struct TestServer {
    addr: SocketAddr,
    templates: tempfile::TempDir,
    engine: Arc<FakeEngine>,
}

impl TestServer {
    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn client(&self) -> ApiClient {
        // loopback traffic must not go through an environment proxy
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        ApiClient::with_client(http, &self.base_url()).unwrap()
    }
}

async fn spawn_server() -> TestServer {
    let templates = tempfile::tempdir().unwrap();
    write_template(
        templates.path(),
        "invoice.twig",
        "<h1>Invoice {{ number }}</h1>",
        "{\"number\": 42}",
    );
    write_template(
        templates.path(),
        "letter.twig",
        "<p>Dear {{ name }}</p>",
        "{\"name\": \"Ada\"}",
    );

    let engine = FakeEngine::new(EngineFailure::None);
    let app = create_app(test_state(templates.path(), engine.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr,
        templates,
        engine,
    }
}

/// Poll `condition` for up to two seconds
async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ============================================================================
// ApiClient
// ============================================================================

#[tokio::test]
async fn test_client_lists_and_loads_templates() {
    let server = spawn_server().await;
    let client = server.client();

    let names = client.list_templates().await.unwrap();
    assert_eq!(names, vec!["invoice.twig", "letter.twig"]);

    let document = client.get_template("letter.twig").await.unwrap();
    assert_eq!(document.content, "<p>Dear {{ name }}</p>");
    assert_eq!(document.variables, "{\"name\": \"Ada\"}");
}

#[tokio::test]
async fn test_client_renders_with_variable_text() {
    let server = spawn_server().await;
    let client = server.client();

    let html = client
        .render("<b>{{ who }}</b>", "{\"who\": \"you\"}")
        .await
        .unwrap();
    assert_eq!(html, "<b>you</b>");
}

#[tokio::test]
async fn test_client_surfaces_api_messages() {
    let server = spawn_server().await;
    let client = server.client();

    let err = client.render("x", "{broken").await.unwrap_err();
    assert!(matches!(err, ClientError::Api(_)));
    assert_eq!(err.user_message(), "Invalid JSON in variables");

    let err = client.get_template("nope.twig").await.unwrap_err();
    assert_eq!(err.user_message(), "Template 'nope.twig' not found");
}

#[tokio::test]
async fn test_client_exports_pdf() {
    let server = spawn_server().await;
    let client = server.client();

    let bytes = client
        .export_pdf("<p>{{ n }}</p>", "{\"n\": 7}", "seven.pdf")
        .await
        .unwrap();
    assert!(bytes.starts_with(PDF_MAGIC));
    assert!(String::from_utf8_lossy(&bytes).contains("<p>7</p>"));
    assert_eq!(server.engine.closes(), 1);
}

#[tokio::test]
async fn test_client_transport_error_is_unknown() {
    // bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    let client = ApiClient::with_client(http, &format!("http://{}", addr)).unwrap();
    let err = client.list_templates().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(err.user_message(), "Unknown error");
}

// ============================================================================
// Workbench
// ============================================================================

fn start_workbench(
    server: &TestServer,
    downloads: &std::path::Path,
) -> (Workbench, Arc<RecordingDisplay>, Arc<RecordingNotifier>) {
    let display = Arc::new(RecordingDisplay::default());
    let notifier = Arc::new(RecordingNotifier::new());
    let settings = test_settings(server.templates.path());

    let workbench = Workbench::start(
        Arc::new(server.client()),
        display.clone(),
        notifier.clone(),
        &settings.preview,
        downloads,
    );
    (workbench, display, notifier)
}

#[tokio::test]
async fn test_workbench_initial_preview_uses_defaults() {
    let server = spawn_server().await;
    let downloads = tempfile::tempdir().unwrap();
    let (workbench, display, _) = start_workbench(&server, downloads.path());

    assert!(eventually(|| !display.shown().is_empty()).await);
    let (html, stale) = display.shown()[0].clone();
    assert!(html.contains("<h1>Welcome</h1>"));
    assert!(html.contains("Hello John Doe!"));
    assert!(!stale);
    assert!(!workbench.has_unsaved_changes());

    let stats = workbench.shutdown().await;
    assert_eq!(stats.renders, 1);
}

#[tokio::test]
async fn test_workbench_template_picker_labels() {
    let server = spawn_server().await;
    let downloads = tempfile::tempdir().unwrap();
    let (workbench, _, _) = start_workbench(&server, downloads.path());

    let options = workbench.load_templates().await;
    let labels: Vec<_> = options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["invoice", "letter"]);

    workbench.shutdown().await;
}

#[tokio::test]
async fn test_workbench_select_loads_editors_and_previews() {
    let server = spawn_server().await;
    let downloads = tempfile::tempdir().unwrap();
    let (mut workbench, display, _) = start_workbench(&server, downloads.path());

    assert!(workbench.select_template("invoice.twig", || false).await);
    assert_eq!(workbench.selected_template(), Some("invoice.twig"));
    assert_eq!(
        workbench.template_editor().get_value(),
        "<h1>Invoice {{ number }}</h1>"
    );
    assert_eq!(workbench.variables_editor().get_value(), "{\"number\": 42}");
    assert!(!workbench.has_unsaved_changes());

    assert!(eventually(|| display
        .shown()
        .iter()
        .any(|(html, _)| html == "<h1>Invoice 42</h1>"))
    .await);

    workbench.shutdown().await;
}

#[tokio::test]
async fn test_workbench_unsaved_changes_need_confirmation() {
    let server = spawn_server().await;
    let downloads = tempfile::tempdir().unwrap();
    let (mut workbench, _, _) = start_workbench(&server, downloads.path());

    assert!(workbench.select_template("invoice.twig", || true).await);
    workbench.template_editor().set_value("<h1>Edited</h1>");
    assert!(workbench.has_unsaved_changes());

    // declined: nothing changes
    assert!(!workbench.select_template("letter.twig", || false).await);
    assert_eq!(workbench.selected_template(), Some("invoice.twig"));
    assert_eq!(workbench.template_editor().get_value(), "<h1>Edited</h1>");

    // accepted: edits are discarded
    assert!(workbench.select_template("letter.twig", || true).await);
    assert_eq!(workbench.selected_template(), Some("letter.twig"));
    assert!(!workbench.has_unsaved_changes());

    workbench.shutdown().await;
}

#[tokio::test]
async fn test_workbench_failed_load_keeps_selection() {
    let server = spawn_server().await;
    let downloads = tempfile::tempdir().unwrap();
    let (mut workbench, _, notifier) = start_workbench(&server, downloads.path());

    assert!(workbench.load_template("letter.twig").await);
    assert!(!workbench.load_template("gone.twig").await);

    assert_eq!(workbench.selected_template(), Some("letter.twig"));
    assert_eq!(workbench.template_editor().get_value(), "<p>Dear {{ name }}</p>");
    assert_eq!(
        notifier.messages(NotificationKind::Error),
        vec!["Template 'gone.twig' not found"]
    );

    workbench.shutdown().await;
}

#[tokio::test]
async fn test_workbench_export_saves_pdf() {
    let server = spawn_server().await;
    let downloads = tempfile::tempdir().unwrap();
    let (mut workbench, _, notifier) = start_workbench(&server, downloads.path());

    assert!(workbench.load_template("letter.twig").await);
    let path = workbench.export_pdf().await.unwrap();

    let filename = path.file_name().unwrap().to_str().unwrap().to_string();
    assert!(filename.starts_with("document-"));
    assert!(filename.ends_with(".pdf"));
    assert!(path.starts_with(downloads.path()));

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(PDF_MAGIC));
    assert!(String::from_utf8_lossy(&bytes).contains("<p>Dear Ada</p>"));
    assert_eq!(
        notifier.messages(NotificationKind::Success),
        vec![format!("PDF exported successfully: {}", filename)]
    );

    workbench.shutdown().await;
}

#[tokio::test]
async fn test_workbench_export_reports_api_error() {
    let server = spawn_server().await;
    let downloads = tempfile::tempdir().unwrap();
    let (workbench, _, notifier) = start_workbench(&server, downloads.path());

    workbench.template_editor().set_value("");
    assert!(workbench.export_pdf().await.is_none());
    assert!(notifier
        .messages(NotificationKind::Error)
        .contains(&"Template content is required".to_string()));
    assert_eq!(std::fs::read_dir(downloads.path()).unwrap().count(), 0);

    workbench.shutdown().await;
}
