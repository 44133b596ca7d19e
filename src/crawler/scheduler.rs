//! Batch scheduler for enrichment runs
//!
//! This module handles:
//! - Partitioning the word list into batches, one supervising task per batch
//! - A run-wide semaphore capping in-flight words at the configured concurrency
//! - The per-word pipeline: dedup check, lookup, persist or record no-result
//! - Stopping new dispatch once the site reports its daily limit

use crate::crawler::fetcher::EntryLookup;
use crate::crawler::{enriched_records, Entry};
use crate::dedup::{DedupGate, Verdict};
use crate::state::NoResultStore;
use crate::storage::{self, InsertOutcome, SharedStorage, Storage};
use crate::HarvestError;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Counts reported at the end of an enrichment run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    /// Words in the input list
    pub total: usize,
    /// Words handed to a worker
    pub dispatched: usize,
    /// Words whose senses were stored
    pub enriched: usize,
    /// Words newly recorded as having no entry
    pub no_result: usize,
    /// Words skipped by the pre-check
    pub skipped: usize,
    /// Words that failed and are left for a later run
    pub failed: usize,
    /// True when the daily limit stopped dispatch early
    pub halted: bool,
}

impl fmt::Display for EnrichSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} words dispatched: {} enriched, {} without result, {} skipped, {} failed{}",
            self.dispatched,
            self.total,
            self.enriched,
            self.no_result,
            self.skipped,
            self.failed,
            if self.halted { " (halted: daily limit)" } else { "" }
        )
    }
}

/// What happened to one word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordOutcome {
    Enriched(usize),
    NoResult,
    Skipped(Verdict),
    /// Another worker is handling the same word right now
    Duplicate,
    /// Dispatch was halted before the lookup started
    Halted,
}

#[derive(Debug, Default)]
struct Counters {
    dispatched: AtomicUsize,
    enriched: AtomicUsize,
    no_result: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

/// Everything a word worker needs, shared across the run
struct WorkerContext {
    lookup: Arc<dyn EntryLookup>,
    gate: DedupGate,
    storage: SharedStorage,
    no_results: Arc<NoResultStore>,
    semaphore: Arc<Semaphore>,
    halt: AtomicBool,
    in_flight: Mutex<HashSet<String>>,
    counters: Counters,
}

/// Runs the enrichment pipeline over a word list
pub struct BatchScheduler {
    lookup: Arc<dyn EntryLookup>,
    storage: SharedStorage,
    no_results: Arc<NoResultStore>,
}

impl BatchScheduler {
    pub fn new(
        lookup: Arc<dyn EntryLookup>,
        storage: SharedStorage,
        no_results: Arc<NoResultStore>,
    ) -> Self {
        Self {
            lookup,
            storage,
            no_results,
        }
    }

    /// Processes `words` in batches of `batch_size` with at most `concurrency` words in flight
    ///
    /// Progress is logged as each batch is dispatched. Per-word failures are
    /// logged and counted, never retried here.
    pub async fn run(
        &self,
        words: Vec<String>,
        batch_size: usize,
        concurrency: usize,
    ) -> EnrichSummary {
        let total = words.len();
        let batch_size = batch_size.max(1);
        let ctx = Arc::new(WorkerContext {
            lookup: self.lookup.clone(),
            gate: DedupGate::new(self.storage.clone(), self.no_results.clone()),
            storage: self.storage.clone(),
            no_results: self.no_results.clone(),
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            halt: AtomicBool::new(false),
            in_flight: Mutex::new(HashSet::new()),
            counters: Counters::default(),
        });

        tracing::info!(
            "Enriching {} words in batches of {} with concurrency {}",
            total,
            batch_size,
            concurrency
        );

        let mut supervisors = JoinSet::new();
        let mut queued = 0;
        for batch in words.chunks(batch_size) {
            if ctx.halt.load(Ordering::SeqCst) {
                break;
            }

            let batch = batch.to_vec();
            queued += batch.len();
            supervisors.spawn(supervise_batch(ctx.clone(), batch));

            tracing::info!("[PROGRESS] {}/{} words dispatched", queued, total);
        }

        while let Some(joined) = supervisors.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Batch supervisor failed: {}", e);
            }
        }

        let counters = &ctx.counters;
        EnrichSummary {
            total,
            dispatched: counters.dispatched.load(Ordering::SeqCst),
            enriched: counters.enriched.load(Ordering::SeqCst),
            no_result: counters.no_result.load(Ordering::SeqCst),
            skipped: counters.skipped.load(Ordering::SeqCst),
            failed: counters.failed.load(Ordering::SeqCst),
            halted: ctx.halt.load(Ordering::SeqCst),
        }
    }
}

/// Spawns one worker per word of the batch, each holding a run-wide permit
async fn supervise_batch(ctx: Arc<WorkerContext>, batch: Vec<String>) {
    let mut workers = JoinSet::new();

    for word in batch {
        let Ok(permit) = ctx.semaphore.clone().acquire_owned().await else {
            break;
        };
        if ctx.halt.load(Ordering::SeqCst) {
            break;
        }

        ctx.counters.dispatched.fetch_add(1, Ordering::SeqCst);
        let ctx = ctx.clone();
        workers.spawn(async move {
            let _permit = permit;
            run_word(&ctx, &word).await;
        });
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Word worker failed: {}", e);
            ctx.counters.failed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Runs the pipeline for one word and books the outcome
async fn run_word(ctx: &WorkerContext, word: &str) {
    let claimed = lock_in_flight(ctx).insert(word.to_string());
    let result = if claimed {
        let result = process_word(ctx, word).await;
        lock_in_flight(ctx).remove(word);
        result
    } else {
        Ok(WordOutcome::Duplicate)
    };

    let counters = &ctx.counters;
    match result {
        Ok(WordOutcome::Enriched(_)) => {
            counters.enriched.fetch_add(1, Ordering::SeqCst);
        }
        Ok(WordOutcome::NoResult) => {
            counters.no_result.fetch_add(1, Ordering::SeqCst);
        }
        Ok(WordOutcome::Skipped(_)) | Ok(WordOutcome::Duplicate) | Ok(WordOutcome::Halted) => {
            counters.skipped.fetch_add(1, Ordering::SeqCst);
        }
        Err(e) => {
            let e = HarvestError::for_word(word, e);
            if e.is_quota_exceeded() {
                if !ctx.halt.swap(true, Ordering::SeqCst) {
                    tracing::error!(
                        "Your search has reached the maximum limit in a day; no new words will be dispatched"
                    );
                }
            } else {
                tracing::error!("Error processing word: {}", e);
            }
            counters.failed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

async fn process_word(ctx: &WorkerContext, word: &str) -> crate::Result<WordOutcome> {
    let verdict = ctx.gate.check(word)?;
    match verdict {
        Verdict::AlreadyEnriched => {
            tracing::info!("Word '{}' already exists in the database", word);
            return Ok(WordOutcome::Skipped(verdict));
        }
        Verdict::NoResult => {
            tracing::warn!("The word '{}' is in the list of words with no results", word);
            return Ok(WordOutcome::Skipped(verdict));
        }
        Verdict::Proceed => {}
    }

    if ctx.halt.load(Ordering::SeqCst) {
        return Ok(WordOutcome::Halted);
    }

    tracing::info!("Processing '{}'", word);
    let entries = ctx.lookup.lookup(word).await?;

    if entries.is_empty() {
        let url = ctx.lookup.entry_url(word);
        tracing::warn!("[NO RESULT] No results found for '{}': {}", word, url);
        ctx.no_results.record(word, &url)?;
        return Ok(WordOutcome::NoResult);
    }

    let records = enriched_records(word, &entries);
    let outcome = storage::lock(&ctx.storage).insert_lemas(word, &records)?;

    match outcome {
        InsertOutcome::Inserted(rows) => {
            tracing::info!("Successfully processed word '{}' ({} senses)", word, rows);
            log_entries(&entries);
            Ok(WordOutcome::Enriched(rows))
        }
        InsertOutcome::AlreadyPresent => {
            tracing::info!("Word '{}' was stored by another worker", word);
            Ok(WordOutcome::Skipped(Verdict::AlreadyEnriched))
        }
    }
}

fn log_entries(entries: &[Entry]) {
    for entry in entries {
        tracing::debug!("Lema: {}", entry.lemma);
        for (i, sense) in entry.senses.iter().enumerate() {
            tracing::debug!(
                "  Arti {}: kelas kata '{}', keterangan '{}'",
                i + 1,
                sense.word_class,
                sense.gloss
            );
        }
    }
}

fn lock_in_flight(ctx: &WorkerContext) -> std::sync::MutexGuard<'_, HashSet<String>> {
    ctx.in_flight
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
