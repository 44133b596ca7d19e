//! Where the words to enrich come from

use crate::storage::{self, SharedStorage, Storage};
use crate::Result;
use std::fmt;
use std::path::{Path, PathBuf};

/// Ordered source of headwords for an enrichment run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordSource {
    /// Newline-delimited local file
    File(PathBuf),
    /// Headwords harvested earlier into the `words` table
    Storage,
}

impl WordSource {
    /// Produces the words in source order
    pub fn load(&self, storage: &SharedStorage) -> Result<Vec<String>> {
        match self {
            Self::File(path) => read_wordlist(path),
            Self::Storage => Ok(storage::lock(storage).all_words()?),
        }
    }
}

impl fmt::Display for WordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Storage => write!(f, "harvested words"),
        }
    }
}

/// Reads one word per line, trimming whitespace and skipping blank lines
pub fn read_wordlist(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
