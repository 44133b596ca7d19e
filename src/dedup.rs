//! Skip decision for words that need no lookup
//!
//! A word is skipped when storage already holds an enrichment for that exact
//! string, or when an earlier run confirmed it has no entry.

use crate::state::NoResultStore;
use crate::storage::{self, SharedStorage, Storage, StorageError};
use std::fmt;
use std::sync::Arc;

/// Outcome of the pre-check for one word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Unknown word, look it up
    Proceed,
    /// Enrichment rows already stored
    AlreadyEnriched,
    /// Recorded earlier as having no entry
    NoResult,
}

impl Verdict {
    pub fn is_skip(&self) -> bool {
        !matches!(self, Self::Proceed)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Proceed => "proceed",
            Self::AlreadyEnriched => "already enriched",
            Self::NoResult => "no result",
        };
        f.write_str(text)
    }
}

/// Read-only pre-check consulted before every lookup
#[derive(Clone)]
pub struct DedupGate {
    storage: SharedStorage,
    no_results: Arc<NoResultStore>,
}

impl DedupGate {
    pub fn new(storage: SharedStorage, no_results: Arc<NoResultStore>) -> Self {
        Self {
            storage,
            no_results,
        }
    }

    /// Checks storage first, then the no-result list
    ///
    /// A storage failure is returned as an error: the word must not be
    /// treated as processed when its state is unknown.
    pub fn check(&self, word: &str) -> Result<Verdict, StorageError> {
        let enriched = storage::lock(&self.storage).lema_exists(word)?;
        if enriched {
            return Ok(Verdict::AlreadyEnriched);
        }
        if self.no_results.contains(word) {
            return Ok(Verdict::NoResult);
        }
        Ok(Verdict::Proceed)
    }

    pub fn should_skip(&self, word: &str) -> Result<bool, StorageError> {
        Ok(self.check(word)?.is_skip())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{shared, EnrichedRecord, SqliteStorage};
    use tempfile::TempDir;

    fn gate(dir: &TempDir) -> (DedupGate, SharedStorage, Arc<NoResultStore>) {
        let storage = shared(SqliteStorage::open_in_memory().unwrap());
        let no_results = Arc::new(NoResultStore::load(dir.path().join("no_result.json")));
        (
            DedupGate::new(storage.clone(), no_results.clone()),
            storage,
            no_results,
        )
    }

    #[test]
    fn test_unknown_word_proceeds() {
        let dir = TempDir::new().unwrap();
        let (gate, _, _) = gate(&dir);
        assert_eq!(gate.check("rumah").unwrap(), Verdict::Proceed);
        assert!(!gate.should_skip("rumah").unwrap());
    }

    #[test]
    fn test_enriched_word_is_skipped() {
        let dir = TempDir::new().unwrap();
        let (gate, storage, _) = gate(&dir);
        storage::lock(&storage)
            .insert_lemas(
                "rumah",
                &[EnrichedRecord {
                    queried_word: "rumah".to_string(),
                    lemma: "rumah".to_string(),
                    word_class: "n[nomina]".to_string(),
                    gloss: "bangunan".to_string(),
                }],
            )
            .unwrap();

        assert_eq!(gate.check("rumah").unwrap(), Verdict::AlreadyEnriched);
        // exact match only
        assert_eq!(gate.check("Rumah").unwrap(), Verdict::Proceed);
    }

    #[test]
    fn test_no_result_word_is_skipped() {
        let dir = TempDir::new().unwrap();
        let (gate, _, no_results) = gate(&dir);
        no_results
            .record("qwerty", "https://kbbi.kemdikbud.go.id/entri/qwerty")
            .unwrap();

        assert_eq!(gate.check("qwerty").unwrap(), Verdict::NoResult);
        assert!(gate.should_skip("qwerty").unwrap());
    }
}
