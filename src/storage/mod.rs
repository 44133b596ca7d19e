//! Storage module for persisting harvest and enrichment data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Headword inventory inserts
//! - Transactional enrichment inserts
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::HarvestError;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage handle shared by all workers of a run
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(HarvestError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// Wraps a backend for sharing between workers
pub fn shared(storage: SqliteStorage) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks the shared backend
///
/// Every write is a single transaction, so a worker that panicked while
/// holding the lock cannot have left partial state behind.
pub fn lock(storage: &SharedStorage) -> MutexGuard<'_, SqliteStorage> {
    storage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One persisted row of the `lema` table: a queried word and one of its senses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub queried_word: String,
    pub lemma: String,
    pub word_class: String,
    pub gloss: String,
}

/// Result of a transactional enrichment insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// This many rows were written
    Inserted(usize),
    /// The word was already enriched; nothing was written
    AlreadyPresent,
}

/// Represents a run in the ledger
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub mode: RunMode,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// What a run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Harvest,
    Enrich,
}

impl RunMode {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Harvest => "harvest",
            Self::Enrich => "enrich",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "harvest" => Some(Self::Harvest),
            "enrich" => Some(Self::Enrich),
            _ => None,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Stopped early because the daily lookup limit was reached
    Halted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Halted => "halted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "halted" => Some(Self::Halted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
