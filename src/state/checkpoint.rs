//! Resume point of the alphabet index crawl
//!
//! The file keeps the single-slot shape older runs wrote
//! (`{"current_letter": "C", "current_page": 4}`) and adds a per-letter
//! record so letters crawled side by side do not overwrite each other.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Progress of one letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LetterProgress {
    /// Next page to fetch
    pub page: u32,
    #[serde(default)]
    pub done: bool,
}

/// Persisted crawl checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CrawlCheckpoint {
    /// Letter of the most recent save
    #[serde(default)]
    pub current_letter: String,

    /// Page of the most recent save
    #[serde(default)]
    pub current_page: u32,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub letters: BTreeMap<String, LetterProgress>,
}

impl CrawlCheckpoint {
    /// Page a letter should resume at, or `None` when it must not be crawled again
    pub fn resume_page(&self, letter: char) -> Option<u32> {
        if let Some(progress) = self.letters.get(&letter.to_string()) {
            return (!progress.done).then_some(progress.page.max(1));
        }

        let Some(saved) = self.legacy_letter() else {
            return Some(1);
        };

        if saved == letter {
            return Some(self.current_page.max(1));
        }

        // Only the single slot is known: everything before it was finished
        if self.letters.is_empty() && letter < saved {
            return None;
        }

        Some(1)
    }

    /// Returns true when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.legacy_letter().is_none() && self.letters.is_empty()
    }

    fn legacy_letter(&self) -> Option<char> {
        self.current_letter
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
    }
}

/// Checkpoint file shared by all letter crawlers
///
/// Every update rewrites the file while holding the lock.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    state: Mutex<CrawlCheckpoint>,
}

impl CheckpointStore {
    /// Loads the checkpoint at `path`
    ///
    /// A missing file is an empty checkpoint. A file that cannot be read or
    /// parsed is logged and also treated as empty.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let checkpoint = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => CrawlCheckpoint::default(),
            Ok(content) => match serde_json::from_str(&content) {
                Ok(checkpoint) => checkpoint,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable checkpoint {}: {}", path.display(), e);
                    CrawlCheckpoint::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CrawlCheckpoint::default(),
            Err(e) => {
                tracing::warn!("Could not read checkpoint {}: {}", path.display(), e);
                CrawlCheckpoint::default()
            }
        };

        Self {
            path,
            state: Mutex::new(checkpoint),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current checkpoint
    pub fn snapshot(&self) -> CrawlCheckpoint {
        self.lock().clone()
    }

    pub fn resume_page(&self, letter: char) -> Option<u32> {
        self.lock().resume_page(letter)
    }

    /// Records that `letter` must continue at `page`
    pub fn save(&self, letter: char, page: u32) -> Result<()> {
        let mut state = self.lock();
        state.current_letter = letter.to_string();
        state.current_page = page;
        state
            .letters
            .insert(letter.to_string(), LetterProgress { page, done: false });
        self.write(&state)
    }

    /// Records that `letter` reached its last page
    pub fn mark_done(&self, letter: char) -> Result<()> {
        let mut state = self.lock();
        let entry = state.letters.entry(letter.to_string()).or_default();
        entry.done = true;
        self.write(&state)
    }

    /// Returns true when every letter in `letters` is marked done
    pub fn all_done(&self, letters: &[char]) -> bool {
        let state = self.lock();
        letters.iter().all(|l| {
            state
                .letters
                .get(&l.to_string())
                .is_some_and(|progress| progress.done)
        })
    }

    /// Forgets all progress and removes the file
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        *state = CrawlCheckpoint::default();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, checkpoint: &CrawlCheckpoint) -> Result<()> {
        let json = serde_json::to_string_pretty(checkpoint)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, CrawlCheckpoint> {
        // A panicked writer leaves the checkpoint in a consistent state
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
