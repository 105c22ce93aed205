//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl and upload cycle end-to-end.

use std::path::Path;
use std::sync::Arc;
use sumi_harvest::config::{
    Config, CrawlerConfig, FailurePolicy, LedgerConfig, SelectorRule, StoreConfig, UserAgentConfig,
};
use sumi_harvest::crawler::{run_harvest, CrawlSession, Fetcher, HtmlParser, ReqwestFetcher, Uploader};
use sumi_harvest::state::{read_ledger_entries, UploadLedger};
use sumi_harvest::storage::MemoryStore;
use sumi_harvest::HarvestError;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rules() -> Vec<SelectorRule> {
    vec![
        SelectorRule::download("a.img"),
        SelectorRule::recurse("a.page"),
    ]
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

fn png(bytes: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_bytes(bytes.to_vec())
}

async fn mount_page(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_resource(server: &MockServer, at: &str, bytes: &[u8]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(png(bytes))
        .expect(1)
        .mount(server)
        .await;
}

/// Builds a session against `origin` that uploads into `store`
async fn session(
    origin: &str,
    ledger_path: &Path,
    store: Arc<MemoryStore>,
    policy: FailurePolicy,
) -> Arc<CrawlSession> {
    let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new(reqwest::Client::new()));
    let ledger = UploadLedger::open(ledger_path).await.unwrap();
    let uploader = Uploader::new(Arc::clone(&fetcher), store, ledger);

    let session = CrawlSession::new(origin, rules(), fetcher, Arc::new(HtmlParser), uploader)
        .unwrap()
        .with_failure_policy(policy);
    Arc::new(session)
}

fn create_test_config(seed: String, ledger: &Path, root: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            seed,
            max_concurrent_requests: Some(4),
            failure_policy: FailurePolicy::FailFast,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        ledger: LedgerConfig {
            path: ledger.display().to_string(),
        },
        store: StoreConfig::Directory {
            root: root.display().to_string(),
        },
        selectors: rules(),
    }
}

#[tokio::test]
async fn test_category_pages_with_cycle() {
    let server = MockServer::start().await;

    // The more specific mock is mounted first so it wins for ?page=2
    Mock::given(method("GET"))
        .and(path("/cat"))
        .and(query_param("page", "2"))
        .respond_with(html(
            r#"<a class="img" href="/img/b.png">b</a><a class="page" href="/cat">back</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/cat",
        r#"<a class="img" href="/img/a.png">a</a><a class="page" href="/cat?page=2">next</a>"#,
    )
    .await;
    mount_resource(&server, "/img/a.png", b"a-bytes").await;
    mount_resource(&server, "/img/b.png", b"b-bytes").await;

    let dir = TempDir::new().unwrap();
    let ledger_path = dir.path().join("uploaded_files.txt");
    let store = Arc::new(MemoryStore::new());
    let session = session(&server.uri(), &ledger_path, store.clone(), FailurePolicy::FailFast).await;

    let report = session.run("/cat").await.unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.uploads, 2);
    assert!(report.is_success());
    assert_eq!(store.keys(), vec!["a.png".to_string(), "b.png".to_string()]);
    assert_eq!(store.get("a.png").unwrap().content_type, "image/png");

    let ledger = read_ledger_entries(&ledger_path).await.unwrap();
    assert!(ledger.contains(&format!("{}/img/a.png", server.uri())));
    assert!(ledger.contains(&format!("{}/img/b.png", server.uri())));
}

#[tokio::test]
async fn test_resource_linked_from_many_pages_uploaded_once() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a class="page" href="/one">1</a><a class="page" href="/two">2</a>
           <a class="page" href="/three">3</a>"#,
    )
    .await;
    for page in ["/one", "/two", "/three"] {
        mount_page(
            &server,
            page,
            r#"<a class="img" href="/img/shared.png">s</a><a class="page" href="/">home</a>"#,
        )
        .await;
    }
    mount_resource(&server, "/img/shared.png", b"shared").await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let session = session(
        &server.uri(),
        &dir.path().join("ledger.txt"),
        store.clone(),
        FailurePolicy::FailFast,
    )
    .await;

    let report = session.run("/").await.unwrap();

    assert_eq!(report.pages_fetched, 4);
    assert_eq!(report.uploads, 1);
    assert_eq!(report.uploads_skipped, 2);
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_ledger_survives_restart() {
    let server = MockServer::start().await;

    // Pages are fetched by both sessions, resources only by the first
    Mock::given(method("GET"))
        .and(path("/gallery"))
        .respond_with(html(
            r#"<a class="img" href="/img/a.png">a</a><a class="img" href="/img/b.png">b</a>"#,
        ))
        .expect(2)
        .mount(&server)
        .await;
    mount_resource(&server, "/img/a.png", b"a").await;
    mount_resource(&server, "/img/b.png", b"b").await;

    let dir = TempDir::new().unwrap();
    let ledger_path = dir.path().join("uploaded_files.txt");

    let first_store = Arc::new(MemoryStore::new());
    let first = session(&server.uri(), &ledger_path, first_store.clone(), FailurePolicy::FailFast).await;
    let report = first.run("/gallery").await.unwrap();
    assert_eq!(report.uploads, 2);

    let second_store = Arc::new(MemoryStore::new());
    let second = session(&server.uri(), &ledger_path, second_store.clone(), FailurePolicy::FailFast).await;
    let report = second.run("/gallery").await.unwrap();

    assert_eq!(report.uploads, 0);
    assert_eq!(report.uploads_skipped, 2);
    assert_eq!(second_store.write_count(), 0);

    let contents = std::fs::read_to_string(&ledger_path).unwrap();
    assert_eq!(contents.lines().count(), 2);
}

#[tokio::test]
async fn test_same_file_name_last_write_wins() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a class="img" href="/one/logo.png">1</a><a class="img" href="/two/logo.png">2</a>"#,
    )
    .await;
    mount_resource(&server, "/one/logo.png", b"first").await;
    mount_resource(&server, "/two/logo.png", b"second").await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let session = session(
        &server.uri(),
        &dir.path().join("ledger.txt"),
        store.clone(),
        FailurePolicy::FailFast,
    )
    .await;

    let report = session.run("/").await.unwrap();

    assert_eq!(report.uploads, 2);
    assert_eq!(store.keys(), vec!["logo.png".to_string()]);
    assert_eq!(store.get("logo.png").unwrap().body, b"second".to_vec());
}

#[tokio::test]
async fn test_fail_fast_aborts_run() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a class="page" href="/broken">x</a><a class="page" href="/fine">y</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fine"))
        .respond_with(html("<p>nothing here</p>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let session = session(
        &server.uri(),
        &dir.path().join("ledger.txt"),
        store,
        FailurePolicy::FailFast,
    )
    .await;

    let result = session.run("/").await;
    assert!(matches!(result, Err(HarvestError::HttpStatus { status: 500, .. })));
}

#[tokio::test]
async fn test_isolate_keeps_siblings_running() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a class="page" href="/broken">x</a><a class="page" href="/fine">y</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/fine", r#"<a class="img" href="/img/fine.png">f</a>"#).await;
    mount_resource(&server, "/img/fine.png", b"fine").await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let session = session(
        &server.uri(),
        &dir.path().join("ledger.txt"),
        store.clone(),
        FailurePolicy::Isolate,
    )
    .await;

    let report = session.run("/").await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].target, "/broken");
    assert!(report.failures[0].error.contains("503"));
    assert_eq!(store.keys(), vec!["fine.png".to_string()]);
}

#[tokio::test]
async fn test_run_harvest_writes_to_directory_store() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/index",
        r#"<a class="img" href="/files/Cover%20Art.jpg">cover</a><a class="page" href="/index">self</a>"#,
    )
    .await;
    mount_resource(&server, "/files/Cover%20Art.jpg", b"jpeg").await;

    let dir = TempDir::new().unwrap();
    let ledger_path = dir.path().join("ledger.txt");
    let root = dir.path().join("bucket");
    let config = create_test_config(format!("{}/index", server.uri()), &ledger_path, &root);

    let report = run_harvest(&config).await.unwrap();

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.uploads, 1);
    assert_eq!(std::fs::read(root.join("Cover Art.jpg")).unwrap(), b"jpeg");

    let contents = std::fs::read_to_string(&ledger_path).unwrap();
    assert_eq!(contents, format!("{}/files/Cover%20Art.jpg\n", server.uri()));
}
