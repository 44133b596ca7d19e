//! Alphabet index harvest against a mock index

use crate::{quick_retry, temp_storage};
use kbbi_harvest::crawler::Harvester;
use kbbi_harvest::state::CheckpointStore;
use kbbi_harvest::storage::{self, SharedStorage, Storage};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One index page: `words`, the page indicator and, unless last, a next link
fn index_page(letter: char, page: u32, total: u32, words: &[String]) -> String {
    let cells: String = words
        .iter()
        .map(|w| format!(r#"<div class="col-md-3"><a href="/entri/{0}">{0}<sup>1</sup></a></div>"#, w))
        .collect();
    let next = if page < total {
        format!(
            r#"<a title="Ke halaman berikutnya" href="/Cari/Alphabet?masukan={0}&amp;masukanLengkap={0}&amp;page={1}">&rsaquo;</a>"#,
            letter,
            page + 1
        )
    } else {
        String::new()
    };

    format!(
        r#"<html><body><div class="container body-content">
        <div class="row">{}</div>
        <div class="row"><span id="currentPageId">{} / {}</span> {}</div>
        </div></body></html>"#,
        cells, page, total, next
    )
}

fn words_for(letter: char, page: u32) -> Vec<String> {
    (1..=3)
        .map(|i| format!("{}kata{}{}", letter.to_ascii_lowercase(), page, i))
        .collect()
}

async fn mount_index(server: &MockServer, letter: char, page: u32, total: u32, times: u64) {
    Mock::given(method("GET"))
        .and(path("/Cari/Alphabet"))
        .and(query_param("masukan", letter.to_string()))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(index_page(letter, page, total, &words_for(letter, page)))
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .expect(times)
        .mount(server)
        .await;
}

fn harvester(server: &MockServer, storage: SharedStorage, checkpoint: &Path) -> Harvester {
    Harvester::new(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        storage,
        Arc::new(CheckpointStore::load(checkpoint)),
        quick_retry(),
    )
}

#[tokio::test]
async fn test_harvest_visits_every_page_once_in_order() {
    let server = MockServer::start().await;
    for page in 1..=4 {
        mount_index(&server, 'A', page, 4, 1).await;
    }

    let dir = TempDir::new().unwrap();
    let storage = temp_storage(&dir);
    let checkpoint = dir.path().join("checkpoint.json");

    let summary = harvester(&server, storage.clone(), &checkpoint)
        .run(&['A'], 1)
        .await;

    assert_eq!(summary.pages, 4);
    assert_eq!(summary.letters_done, 1);
    assert_eq!(summary.letters_failed, 0);
    assert_eq!(summary.words_inserted, 12);
    assert!(!summary.halted);

    let requests = server.received_requests().await.unwrap();
    let pages: Vec<String> = requests
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "page")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(pages, vec!["1", "2", "3", "4"]);

    let words = storage::lock(&storage).all_words().unwrap();
    assert_eq!(words.len(), 12);
    assert_eq!(words[0], "akata11");
    // homograph markers are stripped
    assert!(words.iter().all(|w| w.len() == "akata11".len()));

    // every letter finished, so nothing is left to resume
    assert!(!checkpoint.exists());
}

#[tokio::test]
async fn test_resume_from_saved_letter_and_page() {
    let server = MockServer::start().await;
    mount_index(&server, 'A', 1, 1, 0).await;
    mount_index(&server, 'B', 1, 1, 0).await;
    mount_index(&server, 'C', 1, 5, 0).await;
    mount_index(&server, 'C', 4, 5, 1).await;
    mount_index(&server, 'C', 5, 5, 1).await;

    let dir = TempDir::new().unwrap();
    let checkpoint = dir.path().join("checkpoint.json");
    std::fs::write(&checkpoint, r#"{"current_letter": "C", "current_page": 4}"#).unwrap();

    let summary = harvester(&server, temp_storage(&dir), &checkpoint)
        .run(&['A', 'B', 'C'], 2)
        .await;

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.letters_done, 3);
    assert!(!checkpoint.exists());
}

#[tokio::test]
async fn test_failed_page_keeps_position() {
    let server = MockServer::start().await;
    mount_index(&server, 'D', 1, 3, 1).await;
    Mock::given(method("GET"))
        .and(path("/Cari/Alphabet"))
        .and(query_param("masukan", "D"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(1)
        .mount(&server)
        .await;
    mount_index(&server, 'E', 1, 1, 1).await;

    let dir = TempDir::new().unwrap();
    let storage = temp_storage(&dir);
    let checkpoint = dir.path().join("checkpoint.json");

    let summary = harvester(&server, storage.clone(), &checkpoint)
        .run(&['D', 'E'], 2)
        .await;

    assert_eq!(summary.letters_failed, 1);
    assert_eq!(summary.letters_done, 1);
    assert_eq!(summary.pages, 2);
    assert_eq!(storage::lock(&storage).count_words().unwrap(), 6);

    // the next run picks D up at the failed page and leaves E alone
    let saved = CheckpointStore::load(&checkpoint);
    assert_eq!(saved.resume_page('D'), Some(2));
    assert_eq!(saved.resume_page('E'), None);
}

#[tokio::test]
async fn test_daily_limit_stops_harvest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Cari/Alphabet"))
        .and(query_param("masukan", "F"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="body-content"><h1>Batas Sehari</h1></div></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_index(&server, 'G', 1, 1, 0).await;

    let dir = TempDir::new().unwrap();
    let checkpoint = dir.path().join("checkpoint.json");

    let summary = harvester(&server, temp_storage(&dir), &checkpoint)
        .run(&['F', 'G'], 1)
        .await;

    assert!(summary.halted);
    assert_eq!(summary.pages, 0);
    assert_eq!(CheckpointStore::load(&checkpoint).resume_page('F'), Some(1));
}
