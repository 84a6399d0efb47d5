//! Video catalog operations against a mock backend

mod common;

use petguard_client::stream_state::{StateChange, StreamState};
use petguard_client::video_catalog::VideoCatalogClient;
use petguard_client::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    server: MockServer,
    state: Arc<StreamState>,
    catalog: Arc<VideoCatalogClient>,
    dir: TempDir,
}

async fn fixture() -> Fixture {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(StreamState::new());
    let catalog = Arc::new(VideoCatalogClient::new(
        common::client_with_timeouts(&server.uri(), common::short_timeouts()),
        state.clone(),
        dir.path().join("downloads"),
    ));
    Fixture {
        server,
        state,
        catalog,
        dir,
    }
}

async fn serve_list(server: &MockServer, names: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::videos_body(names)))
        .mount(server)
        .await;
}

fn video_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_list_replaces_catalog_in_server_order() {
    let f = fixture().await;
    serve_list(&f.server, &["b.mp4", "a.mp4", "c.mp4"]).await;

    let events = Arc::new(AtomicUsize::new(0));
    let counter = events.clone();
    f.state.subscribe(move |change: &StateChange| {
        if let StateChange::Catalog(_) = change {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let videos = f.catalog.list().await.unwrap();
    let names: Vec<&str> = videos.iter().map(|v| v.filename.as_str()).collect();
    assert_eq!(names, vec!["b.mp4", "a.mp4", "c.mp4"]);
    assert_eq!(videos[0].size_bytes, 1024);
    assert!(videos[0].created().is_some());
    assert_eq!(f.catalog.videos().len(), 3);
    assert_eq!(events.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_list_failure_keeps_previous_catalog() {
    let f = fixture().await;
    serve_list(&f.server, &["a.mp4"]).await;
    f.catalog.list().await.unwrap();

    f.server.reset().await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(500).set_body_string("disk error"))
        .mount(&f.server)
        .await;

    let err = f.catalog.list().await.unwrap_err();
    assert!(matches!(err, Error::CatalogUnavailable(_)));
    assert_eq!(f.catalog.videos().len(), 1);
    assert_eq!(f.catalog.videos()[0].filename, "a.mp4");
}

#[tokio::test]
async fn test_download_round_trip() {
    let f = fixture().await;
    let body = video_bytes(256 * 1024);
    Mock::given(method("GET"))
        .and(path("/videos/interaction_1.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&f.server)
        .await;

    let video = f.catalog.download("interaction_1.mp4").await.unwrap();
    assert_eq!(video.filename(), "interaction_1.mp4");
    assert_eq!(video.size(), body.len() as u64);
    assert!(video.path().starts_with(f.dir.path().join("downloads")));
    assert_eq!(video.read().await.unwrap(), body);

    let path = video.path().to_path_buf();
    drop(video);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_download_persist() {
    let f = fixture().await;
    Mock::given(method("GET"))
        .and(path("/videos/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
        .mount(&f.server)
        .await;

    let video = f.catalog.download("clip.mp4").await.unwrap();
    let dest = f.dir.path().join("saved.mp4");
    let kept = video.persist(&dest).unwrap();

    assert_eq!(kept, dest);
    assert_eq!(std::fs::read(&dest).unwrap(), b"mp4-bytes");
}

#[tokio::test]
async fn test_download_missing_file() {
    let f = fixture().await;
    Mock::given(method("GET"))
        .and(path("/videos/gone.mp4"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "Video not found"})))
        .mount(&f.server)
        .await;

    let err = f.catalog.download("gone.mp4").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_concurrent_downloads_use_distinct_paths() {
    let f = fixture().await;
    let body = video_bytes(64 * 1024);
    Mock::given(method("GET"))
        .and(path("/videos/same.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&f.server)
        .await;

    let (a, b) = tokio::join!(f.catalog.download("same.mp4"), f.catalog.download("same.mp4"));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.path(), b.path());
    assert_eq!(a.read().await.unwrap(), body);
    assert_eq!(b.read().await.unwrap(), body);
}

#[tokio::test]
async fn test_delete_then_list_excludes_file() {
    let f = fixture().await;
    serve_list(&f.server, &["a.mp4", "b.mp4"]).await;
    f.catalog.list().await.unwrap();

    f.server.reset().await;
    Mock::given(method("DELETE"))
        .and(path("/videos/a.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
        .expect(1)
        .mount(&f.server)
        .await;
    serve_list(&f.server, &["b.mp4"]).await;

    f.catalog.delete("a.mp4").await.unwrap();
    // not removed speculatively
    assert_eq!(f.catalog.videos().len(), 2);

    let videos = f.catalog.list().await.unwrap();
    assert!(videos.iter().all(|v| v.filename != "a.mp4"));
    assert_eq!(videos.len(), 1);
}

#[tokio::test]
async fn test_delete_failures_surface_and_keep_catalog() {
    let f = fixture().await;
    serve_list(&f.server, &["a.mp4"]).await;
    f.catalog.list().await.unwrap();

    Mock::given(method("DELETE"))
        .and(path("/videos/missing.mp4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&f.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/videos/a.mp4"))
        .respond_with(ResponseTemplate::new(500).set_body_string("locked"))
        .mount(&f.server)
        .await;

    assert!(matches!(
        f.catalog.delete("missing.mp4").await,
        Err(Error::NotFound(_))
    ));
    let err = f.catalog.delete("a.mp4").await.unwrap_err();
    assert!(matches!(err, Error::Server { status: 500, ref body } if body == "locked"));
    assert_eq!(f.catalog.videos().len(), 1);
}
