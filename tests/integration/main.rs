//! Integration tests for enrichment and harvest runs
//!
//! These tests use wiremock to stand in for the dictionary site and drive
//! the real HTTP stack end-to-end.

mod enrich_tests;
mod harvest_tests;
mod session_tests;

use kbbi_harvest::crawler::{build_http_client, EntryFetcher, HeaderPool, RetryPolicy};
use kbbi_harvest::proxy::ProxySelector;
use kbbi_harvest::storage::{self, SharedStorage, SqliteStorage};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

/// Retry policy with the production attempt count and a negligible delay
pub fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

/// Fresh on-disk database inside `dir`
pub fn temp_storage(dir: &TempDir) -> SharedStorage {
    let db = SqliteStorage::new(&dir.path().join("kbbi.db")).expect("Failed to open test database");
    storage::shared(db)
}

/// Entry fetcher talking directly to the mock server
pub fn direct_fetcher(base_url: &str) -> EntryFetcher {
    let selector = ProxySelector::direct();
    let client = build_http_client(Duration::from_secs(5), &selector, false)
        .expect("Failed to build client");
    EntryFetcher::new(
        client,
        Url::parse(base_url).expect("Failed to parse base URL"),
        selector,
        HeaderPool::fixed(),
        quick_retry(),
    )
}

/// Wraps entry markup the way the site lays out its content block
pub fn entry_page(inner: &str) -> String {
    format!(
        r#"<html><head><title>KBBI Daring</title></head><body>
        <header><h2>KBBI Daring</h2></header>
        <div class="container body-content">
            <form id="searchForm" action="/Cari/Kata"><input name="frasa" /></form>
            {}
            <h4>Pesan</h4>
            <ol><li>Tidak ada pesan</li></ol>
        </div>
        <footer><h2>Badan Bahasa</h2></footer>
        </body></html>"#,
        inner
    )
}
