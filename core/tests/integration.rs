//! End-to-end dispatch against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, configures service and request
//! rows pointing at it, and sends through `UreqTransport`. Completion happens
//! on the transport's worker thread, so every test waits on a channel fed by
//! the broadcast subscribers.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use mock_server::{Echo, StatusBody};
use tablehttp_core::{
    DispatchState, HandlerRegistry, HttpMethod, InMemoryConfigStore, RequestDispatcher,
    RequestRecord, ResponseData, ServiceRecord, StatusKind, Transport, UreqTransport,
};

#[derive(Debug)]
enum Notified {
    Succeeded(StatusKind, Option<ResponseData>),
    Failed(StatusKind, Option<ResponseData>),
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Start the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

/// A base URL nothing listens on.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn dispatch(service: ServiceRecord, request: RequestRecord, body: &str) -> Notified {
    init_tracing();
    let store = InMemoryConfigStore::default()
        .with_service("svc", service)
        .with_request("req", request);
    let dispatcher = RequestDispatcher::new(
        "req",
        Arc::new(store),
        Arc::new(HandlerRegistry::new()),
        Arc::new(UreqTransport::new()) as Arc<dyn Transport>,
    );

    let rx = subscribe(&dispatcher);
    dispatcher.send(body);
    let notified = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("no notification within 10s");
    assert_eq!(dispatcher.state(), DispatchState::Completed);
    assert!(rx.try_recv().is_err(), "more than one notification");
    notified
}

fn subscribe(dispatcher: &RequestDispatcher) -> Receiver<Notified> {
    let (tx, rx) = mpsc::channel();
    let failed = tx.clone();
    dispatcher.on_request_failed().subscribe(move |status, data| {
        let _ = failed.send(Notified::Failed(status, data.cloned()));
    });
    dispatcher.on_request_succeeded().subscribe(move |status, data| {
        let _ = tx.send(Notified::Succeeded(status, data.cloned()));
    });
    rx
}

#[test]
fn ok_response_is_a_success() {
    let base = start_server();
    let notified = dispatch(
        ServiceRecord::new("svc", base),
        RequestRecord::new("req", "svc", HttpMethod::Get, "/status/200"),
        "",
    );
    let Notified::Succeeded(status, Some(data)) = notified else {
        panic!("expected success, got {notified:?}");
    };
    assert_eq!(status, StatusKind::Ok);
    let body: StatusBody = serde_json::from_str(&data.content).unwrap();
    assert_eq!(body.code, 200);
    assert_eq!(
        data.headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
}

#[test]
fn server_error_on_connected_transport_is_a_success() {
    let base = start_server();
    let notified = dispatch(
        ServiceRecord::new("svc", base),
        RequestRecord::new("req", "svc", HttpMethod::Post, "/status/500"),
        "{}",
    );
    assert!(
        matches!(notified, Notified::Succeeded(StatusKind::InternalServerError, Some(_))),
        "{notified:?}"
    );
}

#[test]
fn unmapped_status_is_unrecognized() {
    let base = start_server();
    let notified = dispatch(
        ServiceRecord::new("svc", base),
        RequestRecord::new("req", "svc", HttpMethod::Delete, "/status/202"),
        "",
    );
    assert!(
        matches!(notified, Notified::Succeeded(StatusKind::Unrecognized, Some(_))),
        "{notified:?}"
    );
}

#[test]
fn merged_headers_verb_and_body_reach_the_server() {
    let base = start_server();
    let notified = dispatch(
        ServiceRecord::new("svc", base)
            .with_header("x-client", "tablehttp")
            .with_header("x-mode", "service"),
        RequestRecord::new("req", "svc", HttpMethod::Patch, "/echo")
            .with_header("x-mode", "request")
            .with_header("content-type", "application/json"),
        r#"{"qty":3}"#,
    );
    let Notified::Succeeded(StatusKind::Ok, Some(data)) = notified else {
        panic!("expected success, got {notified:?}");
    };
    let echo: Echo = serde_json::from_str(&data.content).unwrap();
    assert_eq!(echo.method, "PATCH");
    assert_eq!(echo.headers["x-client"], "tablehttp");
    assert_eq!(echo.headers["x-mode"], "request");
    assert_eq!(echo.body, r#"{"qty":3}"#);
}

#[test]
fn refused_connection_is_an_unrecognized_failure() {
    let notified = dispatch(
        ServiceRecord::new("svc", closed_port_url()),
        RequestRecord::new("req", "svc", HttpMethod::Get, "/status/200"),
        "",
    );
    assert!(
        matches!(notified, Notified::Failed(StatusKind::Unrecognized, None)),
        "{notified:?}"
    );
}

#[test]
fn configured_timeout_bounds_the_request() {
    let base = start_server();
    let notified = dispatch(
        ServiceRecord::new("svc", base).with_timeout(1),
        RequestRecord::new("req", "svc", HttpMethod::Get, "/delay/3000").with_timeout(30),
        "",
    );
    assert!(
        matches!(notified, Notified::Failed(StatusKind::Unrecognized, None)),
        "{notified:?}"
    );
}
