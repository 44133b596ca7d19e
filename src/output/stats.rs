//! Statistics from the harvest database and side files
//!
//! This module provides functionality for extracting and displaying
//! inventory and enrichment counts, crawl progress and recent runs.

use crate::state::{CheckpointStore, CrawlCheckpoint, NoResultStore};
use crate::storage::{RunRecord, Storage};
use crate::HarvestError;

/// How many runs `stats` lists
pub const RECENT_RUNS: usize = 5;

/// Harvest and enrichment statistics
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Headwords in the inventory
    pub total_words: u64,

    /// Rows in the `lema` table
    pub total_lemas: u64,

    /// Distinct queried words with at least one row
    pub enriched_words: u64,

    /// Words confirmed to have no entry
    pub no_result_words: usize,

    /// Saved crawl progress
    pub checkpoint: CrawlCheckpoint,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from storage and the side files
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `no_results` - The no-result list
/// * `checkpoint` - The crawl checkpoint
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn Storage,
    no_results: &NoResultStore,
    checkpoint: &CheckpointStore,
) -> Result<HarvestStatistics, HarvestError> {
    Ok(HarvestStatistics {
        total_words: storage.count_words()?,
        total_lemas: storage.count_lemas()?,
        enriched_words: storage.count_enriched_words()?,
        no_result_words: no_results.len(),
        checkpoint: checkpoint.snapshot(),
        recent_runs: storage.latest_runs(RECENT_RUNS)?,
    })
}

/// Wall-clock duration of a finished run, in seconds
pub fn run_duration_seconds(run: &RunRecord) -> Option<i64> {
    let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    let finished = run
        .finished_at
        .as_deref()?
        .parse::<chrono::DateTime<chrono::Utc>>()
        .ok()?;
    Some((finished - started).num_seconds())
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Inventory:");
    println!("  Headwords: {}", stats.total_words);
    println!();

    println!("Enrichment:");
    println!("  Lema rows: {}", stats.total_lemas);
    println!("  Enriched words: {}", stats.enriched_words);
    println!("  Words without result: {}", stats.no_result_words);

    let coverage = if stats.total_words > 0 {
        (stats.enriched_words as f64 / stats.total_words as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "  Coverage: {:.1}% ({} / {} headwords enriched)",
        coverage, stats.enriched_words, stats.total_words
    );
    println!();

    println!("Crawl Checkpoint:");
    if stats.checkpoint.is_empty() {
        println!("  (none)");
    } else {
        if !stats.checkpoint.current_letter.is_empty() {
            println!(
                "  Last saved: letter {}, page {}",
                stats.checkpoint.current_letter, stats.checkpoint.current_page
            );
        }
        for (letter, progress) in &stats.checkpoint.letters {
            if progress.done {
                println!("  {}: done", letter);
            } else {
                println!("  {}: page {}", letter, progress.page);
            }
        }
    }
    println!();

    if !stats.recent_runs.is_empty() {
        println!("Recent Runs:");
        for run in &stats.recent_runs {
            let duration = run_duration_seconds(run)
                .map(|secs| format!("{}s", secs))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  #{} {} {} started {} ({})",
                run.id, run.mode, run.status, run.started_at, duration
            );
        }
        println!();
    }
}
