//! Enrichment runs against a mock entry site

use crate::{direct_fetcher, entry_page, temp_storage};
use kbbi_harvest::crawler::BatchScheduler;
use kbbi_harvest::state::NoResultStore;
use kbbi_harvest::storage::{self, Storage};
use kbbi_harvest::FetchError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RUMAH: &str = r#"
    <h2>ru&#183;mah<sup>1</sup></h2>
    <ol>
        <li><span class="jk" title="nomina">n</span> bangunan untuk tempat tinggal</li>
        <li><span class="jk" title="verba">v</span> berumah; bertempat tinggal</li>
    </ol>"#;

const NOT_FOUND: &str = r#"<h4>Entri tidak ditemukan.</h4>"#;

const DAILY_LIMIT: &str = r#"<html><body>
    <div class="body-content"><h1>Batas Sehari</h1>
    <p>Pencarian Anda telah mencapai batas maksimum dalam sehari</p></div>
    </body></html>"#;

async fn mount_page(server: &MockServer, route: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_enrich_twice_is_idempotent() {
    let server = MockServer::start().await;
    mount_page(&server, "/entri/rumah", entry_page(RUMAH), 1).await;
    mount_page(&server, "/entri/xyzzy", entry_page(NOT_FOUND), 1).await;

    let dir = TempDir::new().unwrap();
    let storage = temp_storage(&dir);
    let no_results = Arc::new(NoResultStore::load(dir.path().join("no_result.json")));
    let scheduler = BatchScheduler::new(
        Arc::new(direct_fetcher(&server.uri())),
        storage.clone(),
        no_results.clone(),
    );

    let words = vec!["rumah".to_string(), "xyzzy".to_string()];
    let first = scheduler.run(words.clone(), 100, 10).await;
    assert_eq!(first.enriched, 1);
    assert_eq!(first.no_result, 1);
    assert_eq!(first.failed, 0);

    let second = scheduler.run(words, 100, 10).await;
    assert_eq!(second.enriched, 0);
    assert_eq!(second.skipped, 2);

    let db = storage::lock(&storage);
    assert_eq!(db.count_lemas().unwrap(), 2);
    assert_eq!(db.count_enriched_words().unwrap(), 1);
    assert!(db.lema_exists("rumah").unwrap());
}

#[tokio::test]
async fn test_no_result_file_lists_word_and_url() {
    let server = MockServer::start().await;
    mount_page(&server, "/entri/xyzzy", entry_page(NOT_FOUND), 1).await;

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("no_result.json");
    let scheduler = BatchScheduler::new(
        Arc::new(direct_fetcher(&server.uri())),
        temp_storage(&dir),
        Arc::new(NoResultStore::load(&file)),
    );

    scheduler.run(vec!["xyzzy".to_string()], 10, 1).await;

    let content = std::fs::read_to_string(&file).expect("no-result file should exist");
    let records: serde_json::Value = serde_json::from_str(&content).unwrap();
    let records = records.as_array().expect("no-result file is a JSON array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["word"], "xyzzy");
    assert_eq!(
        records[0]["url"].as_str().unwrap(),
        format!("{}/entri/xyzzy", server.uri())
    );

    // a fresh load sees the word
    assert!(NoResultStore::load(&file).contains("xyzzy"));
}

#[tokio::test]
async fn test_daily_limit_is_not_retried() {
    let server = MockServer::start().await;
    mount_page(&server, "/entri/batas", DAILY_LIMIT.to_string(), 1).await;

    let fetcher = direct_fetcher(&server.uri());
    let err = fetcher.fetch("batas").await.unwrap_err();
    assert!(matches!(err, FetchError::QuotaExceeded { .. }));
}

#[tokio::test]
async fn test_daily_limit_halts_dispatch() {
    let server = MockServer::start().await;
    mount_page(&server, "/entri/batas", DAILY_LIMIT.to_string(), 1).await;
    mount_page(&server, "/entri/rumah", entry_page(RUMAH), 0).await;
    mount_page(&server, "/entri/air", entry_page(RUMAH), 0).await;

    let dir = TempDir::new().unwrap();
    let no_results = Arc::new(NoResultStore::load(dir.path().join("no_result.json")));
    let scheduler = BatchScheduler::new(
        Arc::new(direct_fetcher(&server.uri())),
        temp_storage(&dir),
        no_results.clone(),
    );

    let words = vec!["batas".to_string(), "rumah".to_string(), "air".to_string()];
    let summary = scheduler.run(words, 10, 1).await;

    assert!(summary.halted);
    assert_eq!(summary.dispatched, 1);
    assert!(no_results.is_empty());
}

#[tokio::test]
async fn test_dropped_connections_are_retried_three_times() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let accepted = connections.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    let fetcher = direct_fetcher(&format!("http://{}", addr));
    match fetcher.fetch("rumah").await {
        Err(FetchError::Transient { attempts, url, .. }) => {
            assert_eq!(attempts, 3);
            assert_eq!(url, format!("http://{}/entri/rumah", addr));
        }
        other => panic!("expected a transient error, got {:?}", other),
    }
    assert_eq!(connections.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_provider_error_detail_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/entri/rumah"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"detail": "API key is invalid"}"#)
                .insert_header("content-type", "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = direct_fetcher(&server.uri());
    match fetcher.fetch("rumah").await {
        Err(FetchError::Status { status, detail, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(detail, "API key is invalid");
        }
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_word_with_space_is_one_path_segment() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/entri/rumah%20sakit",
        entry_page(
            r#"<h2>rumah sakit</h2>
            <ol><li><span title="nomina">n</span> gedung tempat merawat orang sakit</li></ol>"#,
        ),
        1,
    )
    .await;

    let entries = direct_fetcher(&server.uri())
        .fetch("rumah sakit")
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].lemma, "rumah sakit");
    assert_eq!(entries[0].senses[0].word_class, "n[nomina]");
}
