//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use chrono::NaiveDateTime;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use walker::config::Config;
use walker::crawler::{run_crawl, Coordinator, FrontierEmpty, StepOutcome};
use walker::storage::{
    MemoryStorage, RunRecord, RunStatus, SqliteStorage, Storage, StorageError, StorageResult,
    StoredRecord, LAST_UPDATE_FORMAT,
};
use walker::WalkerError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling from `seed`
fn create_test_config(seed: &str, workers: u32) -> Config {
    let mut config = Config::default();
    config.crawler.seed = seed.to_string();
    config.crawler.workers = workers;
    config.crawler.request_timeout_secs = 5;
    config.crawler.shutdown_grace_ms = 50;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_site_graph() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{base}/page1">Page 1</a>
            <a href="{base}/page2">Page 2</a>
            </body></html>"#,
            base = base_url
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/page1",
        format!(
            r#"<html><head><title>Page 1</title></head><body>
            <a href="{base}/">Home</a>
            <a href="{base}/missing">Broken</a>
            </body></html>"#,
            base = base_url
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/page2",
        "<html><head><title>Page 2</title></head><body>Leaf</body></html>".to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", base_url);
    let mut coordinator =
        Coordinator::new(create_test_config(&seed, 1), MemoryStorage::new()).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.visited, 4);
    assert_eq!(summary.stored, 3);
    assert_eq!(summary.status_failures, 1);
    assert_eq!(summary.transport_failures, 0);
    assert!(!summary.cancelled);
    assert!(coordinator.frontier().is_empty());

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_records().unwrap(), 3);
    assert!(storage
        .get_record(&format!("{}/missing", base_url))
        .unwrap()
        .is_none());

    let home = storage.get_record(&seed).unwrap().unwrap();
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert!(home.text.contains("Page 1"));
    assert!(home.source.contains("<title>Home</title>"));

    let leaf = storage
        .get_record(&format!("{}/page2", base_url))
        .unwrap()
        .unwrap();
    assert_eq!(leaf.title.as_deref(), Some("Page 2"));

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.pages_stored, 3);
    assert_eq!(run.seed, seed);
}

#[tokio::test]
async fn test_not_found_seed_stores_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("http://elsewhere.example/"))
        .mount(&mock_server)
        .await;

    let seed = format!("{}/gone", mock_server.uri());
    let mut coordinator =
        Coordinator::new(create_test_config(&seed, 1), MemoryStorage::new()).unwrap();

    match coordinator.step().await {
        StepOutcome::Skipped { uri, error } => {
            assert_eq!(uri, seed);
            assert_eq!(error.status_code(), Some(404));
        }
        other => panic!("expected a skipped step, got {:?}", other),
    }

    // The body of a failed fetch is never scanned for links
    assert!(coordinator.frontier().is_empty());
    assert!(coordinator.step().await.is_terminated());

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.upsert_calls(), 0);
    assert_eq!(coordinator.stats().status_failures, 1);
}

#[tokio::test]
async fn test_single_step_on_leaf_page() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/leaf",
        "<html><head><title> Leaf </title></head><body>No links here</body></html>".to_string(),
    )
    .await;

    let seed = format!("{}/leaf", mock_server.uri());
    let mut coordinator =
        Coordinator::new(create_test_config(&seed, 1), MemoryStorage::new()).unwrap();

    match coordinator.step().await {
        StepOutcome::Stored {
            uri,
            discovered,
            enqueued,
        } => {
            assert_eq!(uri, seed);
            assert_eq!(discovered, 0);
            assert_eq!(enqueued, 0);
        }
        other => panic!("expected a stored step, got {:?}", other),
    }

    assert_eq!(coordinator.frontier().take(), Err(FrontierEmpty));

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    let record = storage.get_record(&seed).unwrap().unwrap();
    assert_eq!(record.title.as_deref(), Some("Leaf"));
    assert_eq!(record.text, " Leaf No links here");
    assert!(NaiveDateTime::parse_from_str(&record.last_update, LAST_UPDATE_FORMAT).is_ok());
}

#[tokio::test]
async fn test_bare_seed_is_fetched_over_http() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/start",
        "<html><head><title>Start</title></head></html>".to_string(),
    )
    .await;

    let bare = format!("{}/start", mock_server.uri().trim_start_matches("http://"));
    let mut coordinator =
        Coordinator::new(create_test_config(&bare, 1), MemoryStorage::new()).unwrap();

    // The frontier keeps the address as given
    assert!(coordinator.frontier().has_seen(&bare));

    let summary = coordinator.run().await.unwrap();
    assert_eq!(summary.stored, 1);

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    let record = storage
        .get_record(&format!("http://{}", bare))
        .unwrap()
        .unwrap();
    assert_eq!(record.title.as_deref(), Some("Start"));
}

#[tokio::test]
async fn test_multi_worker_crawl_terminates() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let pages = 12;

    // Every page links to every other page
    let links: String = (0..pages)
        .map(|i| format!("<a href=\"{}/p{}\">p{}</a>\n", base_url, i, i))
        .collect();
    for i in 0..pages {
        mount_page(
            &mock_server,
            &format!("/p{}", i),
            format!("<html><head><title>P{}</title></head><body>{}</body></html>", i, links),
        )
        .await;
    }

    let config = create_test_config(&format!("{}/p0", base_url), 4);
    let mut coordinator = Coordinator::new(config, MemoryStorage::new()).unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(30), coordinator.run())
        .await
        .expect("crawl did not terminate")
        .unwrap();

    assert_eq!(summary.visited, pages as u64);
    assert_eq!(summary.stored, pages as u64);
    assert_eq!(summary.links_enqueued, pages as u64 - 1);
    assert_eq!(coordinator.frontier().seen_count(), pages);
    assert_eq!(coordinator.frontier().in_flight(), 0);

    // Each address was fetched exactly once
    let storage = coordinator.storage();
    assert_eq!(storage.lock().unwrap().upsert_calls(), pages as u64);
}

#[tokio::test]
async fn test_cancellation_abandons_slow_fetch() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<title>Slow</title>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let seed = format!("{}/slow", mock_server.uri());
    let mut coordinator = Coordinator::new(create_test_config(&seed, 2), MemoryStorage::new())
        .unwrap()
        .with_cancellation(cancel);

    let summary = coordinator.run().await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.stored, 0);

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_records().unwrap(), 0);
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Cancelled
    );
}

#[tokio::test]
async fn test_recrawl_replaces_records() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_page(
        &mock_server,
        "/",
        format!(
            "<html><head><title>Root</title></head><body><a href=\"{}/about\">About</a></body></html>",
            base_url
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/about",
        "<html><head><title>About</title></head></html>".to_string(),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("walker.db");
    let seed = format!("{}/", base_url);

    for _ in 0..2 {
        let storage = SqliteStorage::new(&db_path).unwrap();
        let summary = run_crawl(
            create_test_config(&seed, 1),
            storage,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(summary.stored, 2);
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_records().unwrap(), 2);
    assert_eq!(storage.count_runs().unwrap(), 2);

    let about = storage
        .get_record(&format!("{}/about", base_url))
        .unwrap()
        .unwrap();
    assert_eq!(about.title.as_deref(), Some("About"));
}

/// Storage whose document writes always fail, either with an error or by
/// panicking while the storage lock is held
#[derive(Default)]
struct BrokenStorage {
    inner: MemoryStorage,
    panic_on_write: bool,
}

impl Storage for BrokenStorage {
    fn upsert(&mut self, _record: &StoredRecord) -> StorageResult<()> {
        if self.panic_on_write {
            panic!("storage backend crashed");
        }
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    fn get_record(&self, url: &str) -> StorageResult<Option<StoredRecord>> {
        self.inner.get_record(url)
    }

    fn count_records(&self) -> StorageResult<u64> {
        self.inner.count_records()
    }

    fn create_run(&mut self, seed: &str, config_hash: &str) -> StorageResult<i64> {
        self.inner.create_run(seed, config_hash)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus, pages_stored: u64) -> StorageResult<()> {
        self.inner.finish_run(run_id, status, pages_stored)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run()
    }

    fn count_runs(&self) -> StorageResult<u64> {
        self.inner.count_runs()
    }
}

#[tokio::test]
async fn test_storage_failures_do_not_stop_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_page(
        &mock_server,
        "/",
        format!("<a href=\"{}/next\">next</a>", base_url),
    )
    .await;
    mount_page(&mock_server, "/next", "<title>Next</title>".to_string()).await;

    let seed = format!("{}/", base_url);
    let mut coordinator =
        Coordinator::new(create_test_config(&seed, 1), BrokenStorage::default()).unwrap();
    let summary = coordinator.run().await.unwrap();

    // Links are still followed when the record cannot be written
    assert_eq!(summary.visited, 2);
    assert_eq!(summary.storage_failures, 2);
    assert_eq!(summary.stored, 0);

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Completed
    );
}

#[tokio::test]
async fn test_panicking_storage_marks_run_failed() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "<title>Home</title>".to_string()).await;

    let storage = BrokenStorage {
        panic_on_write: true,
        ..BrokenStorage::default()
    };
    let seed = format!("{}/", mock_server.uri());
    let mut coordinator = Coordinator::new(create_test_config(&seed, 1), storage).unwrap();

    let err = coordinator.run().await.unwrap_err();
    assert!(matches!(err, WalkerError::Join(ref e) if e.is_panic()));

    // The panic poisoned the storage lock, yet the run was still closed out
    let storage = coordinator.storage();
    let storage = storage
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.finished_at.is_some());
}

/// Crawls a seed that links to one good page and one dead address
async fn crawl_past_dead_link(workers: u32) {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Grab a free port, then close it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = format!("http://{}/gone", listener.local_addr().unwrap());
    drop(listener);

    mount_page(
        &mock_server,
        "/",
        format!(
            "<html><head><title>Home</title></head><body>\n<a href=\"{}/ok\">ok</a>\n<a href=\"{}\">gone</a>\n</body></html>",
            base_url, dead
        ),
    )
    .await;
    mount_page(&mock_server, "/ok", "<title>Ok</title>".to_string()).await;

    let seed = format!("{}/", base_url);
    let mut coordinator =
        Coordinator::new(create_test_config(&seed, workers), MemoryStorage::new()).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.visited, 3, "workers = {}", workers);
    assert_eq!(summary.stored, 2, "workers = {}", workers);
    assert_eq!(summary.transport_failures, 1, "workers = {}", workers);
    assert_eq!(summary.status_failures, 0, "workers = {}", workers);

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert!(storage.get_record(&dead).unwrap().is_none());
    assert!(storage
        .get_record(&format!("{}/ok", base_url))
        .unwrap()
        .is_some());
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Completed
    );
}

#[tokio::test]
async fn test_transport_failure_does_not_stop_crawl() {
    crawl_past_dead_link(1).await;
}

#[tokio::test]
async fn test_transport_failure_does_not_stop_worker_pool() {
    crawl_past_dead_link(3).await;
}

#[tokio::test]
async fn test_cancellation_lets_fetch_finish_within_grace() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<title>Unhurried</title>")
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&mock_server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let mut config = create_test_config(&format!("{}/page", mock_server.uri()), 1);
    config.crawler.shutdown_grace_ms = 2000;
    let mut coordinator = Coordinator::new(config, MemoryStorage::new())
        .unwrap()
        .with_cancellation(cancel);

    let summary = coordinator.run().await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.stored, 1);
    assert_eq!(summary.abandoned, 0);

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_records().unwrap(), 1);
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Cancelled
    );
}
