use std::path::Path;
use std::sync::Arc;

use reqwest::Client;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vkloader_core::downloader::item_downloader::ItemDownloader;
use vkloader_core::{AudioTrack, ItemOutcome, LoaderError, PoolConfig};

/// Generates deterministic test data.
fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

fn track(server: &MockServer, id: u64) -> AudioTrack {
    AudioTrack {
        id,
        url: format!("{}/audio/{}.mp3", server.uri(), id),
        artist: " Foo ".to_string(),
        title: format!("Bar/{}", id),
    }
}

fn downloader(dir: &Path, skip: bool) -> ItemDownloader {
    let config = PoolConfig::builder(dir)
        .with_workers(1)
        .with_skip_if_exists(skip)
        .build()
        .unwrap();
    ItemDownloader::new(Client::new(), Arc::new(config))
}

/// Names of every entry in `dir`, sorted.
fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------
// Downloads
// ---------------------------------------------------------------

#[tokio::test]
async fn test_download_writes_body_to_derived_name() {
    let server = MockServer::start().await;
    let body = generate_test_data(300 * 1024);

    Mock::given(method("GET"))
        .and(path("/audio/1.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = downloader(dir.path(), false);
    let track = track(&server, 1);

    let outcome = downloader.download(&track).await.unwrap();

    assert_eq!(
        outcome,
        ItemOutcome::Downloaded {
            bytes: body.len() as u64
        }
    );
    let target = dir.path().join("Foo - Bar|1.mp3");
    assert_eq!(downloader.target_path(&track), target);
    assert_eq!(std::fs::read(&target).unwrap(), body);
    assert_eq!(dir_entries(dir.path()), vec!["Foo - Bar|1.mp3"]);
}

#[tokio::test]
async fn test_download_empty_body_creates_empty_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = downloader(dir.path(), false);

    let outcome = downloader.download(&track(&server, 2)).await.unwrap();

    assert_eq!(outcome, ItemOutcome::Downloaded { bytes: 0 });
    let written = std::fs::metadata(dir.path().join("Foo - Bar|2.mp3")).unwrap();
    assert_eq!(written.len(), 0);
}

// ---------------------------------------------------------------
// Skip policy
// ---------------------------------------------------------------

#[tokio::test]
async fn test_skip_existing_non_empty_file_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("Foo - Bar|3.mp3");
    std::fs::write(&target, b"already here").unwrap();

    let outcome = downloader(dir.path(), true)
        .download(&track(&server, 3))
        .await
        .unwrap();

    assert_eq!(outcome, ItemOutcome::Skipped);
    assert_eq!(std::fs::read(&target).unwrap(), b"already here");
}

#[tokio::test]
async fn test_skip_does_not_apply_to_zero_byte_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("Foo - Bar|4.mp3");
    std::fs::write(&target, b"").unwrap();

    let outcome = downloader(dir.path(), true)
        .download(&track(&server, 4))
        .await
        .unwrap();

    assert_eq!(outcome, ItemOutcome::Downloaded { bytes: 5 });
    assert_eq!(std::fs::read(&target).unwrap(), b"fresh");
}

#[tokio::test]
async fn test_existing_file_overwritten_when_skip_disabled() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("Foo - Bar|5.mp3");
    std::fs::write(&target, b"stale and longer").unwrap();

    downloader(dir.path(), false)
        .download(&track(&server, 5))
        .await
        .unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"new");
}

// ---------------------------------------------------------------
// Failures
// ---------------------------------------------------------------

#[tokio::test]
async fn test_non_success_status_leaves_no_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let result = downloader(dir.path(), false)
        .download(&track(&server, 6))
        .await;

    match result {
        Err(LoaderError::Status { status, .. }) => assert_eq!(status.as_u16(), 404),
        other => panic!("expected Status error, got {:?}", other),
    }
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_connection_refused_is_http_error() {
    let dir = tempfile::tempdir().unwrap();
    let track = AudioTrack {
        id: 7,
        url: "http://127.0.0.1:1/audio/7.mp3".to_string(),
        artist: "A".to_string(),
        title: "B".to_string(),
    };

    let result = downloader(dir.path(), false).download(&track).await;

    assert!(matches!(result, Err(LoaderError::Http(_))));
    assert!(dir_entries(dir.path()).is_empty());
}

/// Entries in `dir` that look like partial downloads.
fn partial_entries(dir: &Path) -> Vec<String> {
    dir_entries(dir)
        .into_iter()
        .filter(|name| name.ends_with(".part"))
        .collect()
}

#[tokio::test]
async fn test_long_file_name_within_name_max_downloads() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"long".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let track = AudioTrack {
        id: 8,
        url: format!("{}/audio/8.mp3", server.uri()),
        artist: "A".to_string(),
        title: "T".repeat(230),
    };
    let expected_name = format!("A - {}.mp3", "T".repeat(230));
    assert_eq!(expected_name.len(), 238);

    let outcome = downloader(dir.path(), false).download(&track).await.unwrap();

    assert_eq!(outcome, ItemOutcome::Downloaded { bytes: 4 });
    assert_eq!(std::fs::read(dir.path().join(&expected_name)).unwrap(), b"long");
    assert_eq!(dir_entries(dir.path()), vec![expected_name]);
}

#[tokio::test]
async fn test_rename_failure_removes_partial_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    // A non-empty directory squatting on the target path cannot be replaced by a file.
    let blocker = dir.path().join("Foo - Bar|9.mp3");
    std::fs::create_dir(&blocker).unwrap();
    std::fs::write(blocker.join("keep"), b"x").unwrap();

    let result = downloader(dir.path(), false)
        .download(&track(&server, 9))
        .await;

    assert!(matches!(result, Err(LoaderError::Disk(_))), "got {:?}", result);
    assert!(partial_entries(dir.path()).is_empty());
    assert!(blocker.join("keep").exists());
}

#[tokio::test]
async fn test_truncated_body_removes_partial_file() {
    let server = MockServer::start().await;

    // Announces far more bytes than it sends, so the body stream errors midway.
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![7u8; 16])
                .insert_header("Content-Length", "1048576"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let result = downloader(dir.path(), false)
        .download(&track(&server, 10))
        .await;

    assert!(result.is_err(), "truncated body must fail, got {:?}", result);
    assert!(partial_entries(dir.path()).is_empty());
    assert!(!dir.path().join("Foo - Bar|10.mp3").exists());
}
