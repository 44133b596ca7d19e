//! Alphabet index crawler
//!
//! Walks `/Cari/Alphabet` page by page for each letter and stores every
//! headword found. Each letter runs its own `CrawlState` machine; letters run
//! concurrently up to the configured limit. Progress is checkpointed per
//! letter so an interrupted harvest resumes where it stopped.

use crate::crawler::fetcher::{fetch_body, site_url};
use crate::crawler::parser::{is_quota_page, parse_index_page, IndexPage};
use crate::crawler::retry::RetryPolicy;
use crate::state::{CheckpointStore, CrawlState};
use crate::storage::{self, SharedStorage, Storage};
use crate::{FetchError, HarvestError, Result};
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// URL of index page `page` for `letter`
pub fn index_url(base: &Url, letter: char, page: u32) -> Url {
    let letter = letter.to_string();
    let mut url = site_url(base, &["Cari", "Alphabet"]);
    url.query_pairs_mut()
        .append_pair("masukan", &letter)
        .append_pair("masukanLengkap", &letter)
        .append_pair("page", &page.to_string());
    url
}

/// Totals of a harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    /// Letters that reached their last page, in this run or an earlier one
    pub letters_done: usize,
    pub letters_failed: usize,
    /// Index pages fetched and stored
    pub pages: u32,
    /// Headwords that were new to the inventory
    pub words_inserted: usize,
    /// True when the daily limit stopped the run
    pub halted: bool,
}

impl fmt::Display for HarvestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} letters done, {} failed, {} pages, {} new words{}",
            self.letters_done,
            self.letters_failed,
            self.pages,
            self.words_inserted,
            if self.halted { " (halted: daily limit)" } else { "" }
        )
    }
}

/// Outcome of one letter's crawl
#[derive(Debug)]
pub struct LetterReport {
    pub letter: char,
    /// Where the state machine stopped: `Done`, `Failed`, or `FetchingPage` when halted
    pub state: CrawlState,
    pub pages: u32,
    pub words_inserted: usize,
    pub error: Option<HarvestError>,
}

impl LetterReport {
    pub fn is_halted(&self) -> bool {
        matches!(self.state, CrawlState::FetchingPage { .. })
    }
}

/// Crawls the alphabet index into the headword inventory
#[derive(Clone)]
pub struct Harvester {
    client: Client,
    base_url: Url,
    storage: SharedStorage,
    checkpoint: Arc<CheckpointStore>,
    retry: RetryPolicy,
    halt: Arc<AtomicBool>,
}

impl Harvester {
    pub fn new(
        client: Client,
        base_url: Url,
        storage: SharedStorage,
        checkpoint: Arc<CheckpointStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url,
            storage,
            checkpoint,
            retry,
            halt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Crawls `letters` with at most `concurrency` letters in flight
    ///
    /// Resume positions are read from the checkpoint once, before any letter
    /// starts. A failed letter does not affect the others. The checkpoint is
    /// cleared once every letter is done.
    pub async fn run(&self, letters: &[char], concurrency: usize) -> HarvestSummary {
        let plan = self.checkpoint.snapshot();
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut summary = HarvestSummary::default();
        let mut tasks = JoinSet::new();

        for &letter in letters {
            let Some(start) = plan.resume_page(letter) else {
                tracing::info!("Letter {} was already harvested, skipping", letter);
                if let Err(e) = self.checkpoint.mark_done(letter) {
                    tracing::warn!("Failed to update checkpoint for letter {}: {}", letter, e);
                }
                summary.letters_done += 1;
                continue;
            };

            let harvester = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                Some(harvester.crawl_letter(letter, start).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let report = match joined {
                Ok(Some(report)) => report,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!("Letter task failed: {}", e);
                    summary.letters_failed += 1;
                    continue;
                }
            };

            summary.pages += report.pages;
            summary.words_inserted += report.words_inserted;
            match report.state {
                CrawlState::Done => summary.letters_done += 1,
                CrawlState::Failed { .. } => summary.letters_failed += 1,
                _ => {}
            }
        }

        summary.halted = self.halt.load(Ordering::SeqCst);

        if !summary.halted && self.checkpoint.all_done(letters) {
            match self.checkpoint.clear() {
                Ok(()) => tracing::info!("All letters harvested, checkpoint cleared"),
                Err(e) => tracing::warn!("Failed to clear checkpoint: {}", e),
            }
        }

        summary
    }

    /// Runs the state machine for `letter`, starting at `start_page`
    pub async fn crawl_letter(&self, letter: char, start_page: u32) -> LetterReport {
        let mut report = LetterReport {
            letter,
            state: CrawlState::start(start_page),
            pages: 0,
            words_inserted: 0,
            error: None,
        };

        if start_page > 1 {
            tracing::info!("Resuming letter {} at page {}", letter, start_page);
        }

        let mut state = report.state;
        loop {
            state = match state {
                CrawlState::FetchingPage { page } => {
                    // the last advance already checkpointed this page
                    if self.halt.load(Ordering::SeqCst) {
                        tracing::warn!("Letter {} halted at page {}", letter, page);
                        break;
                    }

                    match self.harvest_page(letter, page).await {
                        Ok((index, inserted)) => {
                            report.pages += 1;
                            report.words_inserted += inserted;
                            CrawlState::after_page(page, index.has_next, index.position)
                        }
                        Err(e) => {
                            if e.is_quota_exceeded() {
                                self.halt.store(true, Ordering::SeqCst);
                            }
                            if let Err(save_err) = self.checkpoint.save(letter, page) {
                                tracing::error!(
                                    "Failed to save checkpoint for letter {}: {}",
                                    letter,
                                    save_err
                                );
                            }
                            let e = HarvestError::CrawlPage {
                                letter,
                                page,
                                source: Box::new(e),
                            };
                            tracing::error!("{}", e);
                            report.error = Some(e);
                            CrawlState::Failed { page }
                        }
                    }
                }
                CrawlState::AdvancingPage { next } => {
                    tracing::info!("Moving to next page for letter {}: page {}", letter, next);
                    if let Err(e) = self.checkpoint.save(letter, next) {
                        tracing::warn!("Failed to save checkpoint for letter {}: {}", letter, e);
                    }
                    state.advance()
                }
                CrawlState::Done => {
                    if let Err(e) = self.checkpoint.mark_done(letter) {
                        tracing::warn!("Failed to save checkpoint for letter {}: {}", letter, e);
                    }
                    tracing::info!(
                        "Finished scraping words for letter {} ({} pages, {} new words)",
                        letter,
                        report.pages,
                        report.words_inserted
                    );
                    break;
                }
                CrawlState::Failed { .. } => break,
            };
        }

        report.state = state;
        report
    }

    /// Fetches one index page and stores its headwords
    async fn harvest_page(&self, letter: char, page: u32) -> Result<(IndexPage, usize)> {
        let url = index_url(&self.base_url, letter, page);
        let body = fetch_body(&self.client, &url, url.as_str(), HeaderMap::new, &self.retry).await?;

        if is_quota_page(&body) {
            return Err(FetchError::QuotaExceeded {
                url: url.to_string(),
            }
            .into());
        }

        let index = parse_index_page(&body);
        if let Some((current, total)) = index.position {
            tracing::info!(
                "Letter {}, page {}/{}: {} words",
                letter,
                current,
                total,
                index.words.len()
            );
        } else {
            tracing::info!("Letter {}, page {}: {} words", letter, page, index.words.len());
        }

        let inserted = storage::lock(&self.storage).insert_words(&index.words)?;
        Ok((index, inserted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_url() {
        let base = Url::parse("https://kbbi.kemdikbud.go.id").unwrap();
        assert_eq!(
            index_url(&base, 'A', 3).as_str(),
            "https://kbbi.kemdikbud.go.id/Cari/Alphabet?masukan=A&masukanLengkap=A&page=3"
        );
    }

    #[test]
    fn test_letter_report_halted() {
        let report = LetterReport {
            letter: 'B',
            state: CrawlState::FetchingPage { page: 2 },
            pages: 1,
            words_inserted: 10,
            error: None,
        };
        assert!(report.is_halted());
    }
}
