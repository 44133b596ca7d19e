//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{EnrichedRecord, InsertOutcome, RunMode, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Workers share one backend behind a mutex; every method is a short
/// synchronous round-trip.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run in the ledger and returns its ID
    fn create_run(&mut self, mode: RunMode, config_hash: &str) -> StorageResult<i64>;

    /// Sets the final status and finish timestamp of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Most recent runs, newest first
    fn latest_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    // ===== Enrichment =====

    /// Returns true if at least one enrichment row exists for this exact word
    fn lema_exists(&self, word: &str) -> StorageResult<bool>;

    /// Writes all rows for one queried word in a single transaction
    ///
    /// The existence check is repeated inside the transaction; when another
    /// worker already stored the word nothing is written and
    /// `InsertOutcome::AlreadyPresent` is returned.
    fn insert_lemas(
        &mut self,
        word: &str,
        records: &[EnrichedRecord],
    ) -> StorageResult<InsertOutcome>;

    // ===== Headwords =====

    /// Inserts headwords in one transaction, ignoring ones already stored
    ///
    /// Returns the number of new rows.
    fn insert_words(&mut self, words: &[String]) -> StorageResult<usize>;

    /// All harvested headwords in insertion order
    fn all_words(&self) -> StorageResult<Vec<String>>;

    // ===== Statistics =====

    fn count_words(&self) -> StorageResult<u64>;

    fn count_lemas(&self) -> StorageResult<u64>;

    /// Number of distinct queried words with at least one enrichment row
    fn count_enriched_words(&self) -> StorageResult<u64>;
}
