//! Health probing against a mock backend

mod common;

use petguard_client::health_monitor::HealthMonitor;
use petguard_client::stream_state::{StateChange, StreamState};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn monitor(server: &MockServer) -> (HealthMonitor, Arc<StreamState>) {
    let client = common::client_with_timeouts(&server.uri(), common::short_timeouts());
    let state = Arc::new(StreamState::new());
    (HealthMonitor::new(client, state.clone()), state)
}

async fn respond(server: &MockServer, template: ResponseTemplate) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ok_sets_connected() {
    let server = MockServer::start().await;
    respond(&server, ResponseTemplate::new(200).set_body_string("ok")).await;
    let (monitor, state) = monitor(&server).await;

    assert!(monitor.probe_once().await);
    assert!(state.is_connected());
}

#[tokio::test]
async fn test_non_200_is_failure() {
    let server = MockServer::start().await;
    let (monitor, state) = monitor(&server).await;
    state.set_connected(true);

    respond(&server, ResponseTemplate::new(503)).await;
    assert!(!monitor.probe_once().await);
    assert!(!state.is_connected());

    // success statuses other than 200 do not count either
    respond(&server, ResponseTemplate::new(204)).await;
    assert!(!monitor.probe_once().await);
}

#[tokio::test]
async fn test_two_timeouts_then_recovery() {
    let server = MockServer::start().await;
    let (monitor, state) = monitor(&server).await;

    let flips = Arc::new(Mutex::new(Vec::new()));
    let log = flips.clone();
    state.subscribe(move |change: &StateChange| {
        if let StateChange::Connectivity(c) = change {
            log.lock().unwrap().push(*c);
        }
    });

    respond(&server, ResponseTemplate::new(200)).await;
    assert!(monitor.probe_once().await);

    // health timeout is 200ms
    respond(&server, ResponseTemplate::new(200).set_delay(Duration::from_millis(600))).await;
    assert!(!monitor.probe_once().await);
    assert!(!state.is_connected());
    assert!(!monitor.probe_once().await);
    assert!(!state.is_connected());

    respond(&server, ResponseTemplate::new(200)).await;
    assert!(monitor.probe_once().await);
    assert!(state.is_connected());

    assert_eq!(*flips.lock().unwrap(), vec![true, false, true]);
}

#[tokio::test]
async fn test_periodic_probe_and_stop() {
    let server = MockServer::start().await;
    respond(&server, ResponseTemplate::new(200)).await;
    let (monitor, state) = monitor(&server).await;

    monitor.start(Duration::from_millis(50)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(state.is_connected());

    monitor.stop().await;
    respond(&server, ResponseTemplate::new(500)).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // no probe runs after stop
    assert!(state.is_connected());
}
