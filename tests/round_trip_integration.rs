//! Backup then Restore against the same mock service: the restored body
//! must match what was originally backed up.

use std::sync::Arc;

use backup_core::backup::{BackupTransfer, prepare_backup_dir, seed_queue};
use backup_core::config::Config;
use backup_core::digest::EtagAlgorithm;
use backup_core::http_client::StorageClient;
use backup_core::lifecycle::{Lifecycle, Mode};
use backup_core::pause_barrier::PauseBarrier;
use backup_core::queue::WorkQueue;
use backup_core::restore::{RestoreTransfer, walk_backup_dir};
use backup_core::Dispatcher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Records every PUT body it sees, for the final content-equality assertion.
struct RecordingResponder {
    bodies: Arc<StdMutex<Vec<Vec<u8>>>>,
    calls: Arc<AtomicUsize>,
}

impl Respond for RecordingResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(request.body.clone());
        ResponseTemplate::new(201)
    }
}

#[tokio::test]
async fn restored_body_matches_the_original_backup() {
    let mock_server = MockServer::start().await;
    let original_dir = TempDir::new().unwrap();
    let restore_source_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/cat/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"items":{"doc.txt":{"Content-Type":"text/plain"}}}"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cat/doc.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"round trip payload".to_vec()))
        .mount(&mock_server)
        .await;

    let backup_dir = original_dir.path().join("backup");
    prepare_backup_dir(&backup_dir).await.unwrap();
    tokio::fs::create_dir_all(&backup_dir).await.unwrap();

    let backup_config = Config {
        endpoint: Config::normalize_endpoint(url::Url::parse(&mock_server.uri()).unwrap()),
        token: "test-token".to_string(),
        origin: "https://localhost".to_string(),
        version: "0.1.0-test",
        simultaneous: 2,
        backup_dir: backup_dir.clone(),
        category: None,
        include_public: false,
        etag_algorithm: None,
    };

    let queue = Arc::new(WorkQueue::new());
    seed_queue(&queue, Some("cat"), false);
    let client = StorageClient::new(&backup_config).unwrap();
    let barrier = Arc::new(PauseBarrier::new());
    let lifecycle = Lifecycle::new(Arc::clone(&queue), Mode::Backup);
    let transfer = BackupTransfer::new(client, Arc::clone(&queue), barrier.clone(), backup_dir.clone(), lifecycle);
    let dispatcher = Dispatcher::new(Arc::clone(&queue), barrier, 2, transfer.into_transfer_fn());
    dispatcher.kickoff();
    tokio::time::timeout(std::time::Duration::from_secs(5), dispatcher.wait_until_done())
        .await
        .unwrap();
    assert!(queue.is_empty());

    // Mirror the downloaded tree into a second "restore source" directory,
    // the way a real restore run would point --backup-dir at a prior
    // backup's output.
    copy_dir(&backup_dir, restore_source_dir.path());

    let bodies = Arc::new(StdMutex::new(Vec::new()));
    let calls = Arc::new(AtomicUsize::new(0));
    Mock::given(method("PUT"))
        .and(path("/cat/doc.txt"))
        .respond_with(RecordingResponder {
            bodies: Arc::clone(&bodies),
            calls: Arc::clone(&calls),
        })
        .mount(&mock_server)
        .await;

    let restore_config = Config {
        endpoint: Config::normalize_endpoint(url::Url::parse(&mock_server.uri()).unwrap()),
        token: "test-token".to_string(),
        origin: "https://localhost".to_string(),
        version: "0.1.0-test",
        simultaneous: 2,
        backup_dir: restore_source_dir.path().join("cat"),
        category: None,
        include_public: false,
        etag_algorithm: Some(EtagAlgorithm::Md5),
    };

    let restore_queue = Arc::new(WorkQueue::new());
    walk_backup_dir(&restore_queue, &restore_config.backup_dir, "/").await.unwrap();
    let client = StorageClient::new(&restore_config).unwrap();
    let barrier = Arc::new(PauseBarrier::new());
    let lifecycle = Lifecycle::new(Arc::clone(&restore_queue), Mode::Restore);
    let transfer = RestoreTransfer::new(
        client,
        Arc::clone(&restore_queue),
        barrier.clone(),
        restore_config.backup_dir.clone(),
        restore_config.etag_algorithm,
        lifecycle,
    );
    let dispatcher = Dispatcher::new(Arc::clone(&restore_queue), barrier, 2, transfer.into_transfer_fn());
    dispatcher.kickoff();
    tokio::time::timeout(std::time::Duration::from_secs(5), dispatcher.wait_until_done())
        .await
        .unwrap();

    assert!(restore_queue.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(bodies.lock().unwrap()[0], b"round trip payload");
}

fn copy_dir(from: &std::path::Path, to: &std::path::Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let dest = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &dest);
        } else {
            std::fs::copy(entry.path(), dest).unwrap();
        }
    }
}
