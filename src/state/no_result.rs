//! Words confirmed to have no dictionary entry
//!
//! Kept as a JSON array of `{word, url}` records. The file is read once per
//! run; afterwards the in-memory set answers lookups and every new record
//! rewrites the file under the same lock.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// A word whose lookup produced zero entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoResultRecord {
    pub word: String,
    pub url: String,
}

#[derive(Debug, Default)]
struct Records {
    list: Vec<NoResultRecord>,
    words: HashSet<String>,
}

/// Write-through store of no-result records
#[derive(Debug)]
pub struct NoResultStore {
    path: PathBuf,
    records: Mutex<Records>,
}

impl NoResultStore {
    /// Loads the records at `path`; missing or unreadable files count as empty
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let list: Vec<NoResultRecord> = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable no-result file {}: {}", path.display(), e);
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!("Could not read no-result file {}: {}", path.display(), e);
                Vec::new()
            }
        };

        let words = list.iter().map(|r| r.word.clone()).collect();
        Self {
            path,
            records: Mutex::new(Records { list, words }),
        }
    }

    /// Exact, case-sensitive membership
    pub fn contains(&self, word: &str) -> bool {
        self.lock().words.contains(word)
    }

    /// Appends a record and rewrites the file
    ///
    /// Returns false, without touching the file, if the word is already listed.
    /// The word only becomes a member once the file write succeeded.
    pub fn record(&self, word: &str, url: &str) -> Result<bool> {
        let mut records = self.lock();
        if records.words.contains(word) {
            return Ok(false);
        }

        let mut list = records.list.clone();
        list.push(NoResultRecord {
            word: word.to_string(),
            url: url.to_string(),
        });
        let json = serde_json::to_string_pretty(&list)?;
        std::fs::write(&self.path, json)?;

        records.list = list;
        records.words.insert(word.to_string());
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
