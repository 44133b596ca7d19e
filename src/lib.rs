//! KBBI Harvest: a dictionary enrichment pipeline
//!
//! This crate harvests the headword inventory of the KBBI online dictionary
//! by walking its alphabetical index, and enriches word lists with the
//! structured senses found on each entry page. Results land in SQLite;
//! words already known (enriched, or confirmed to have no entry) are skipped.

pub mod config;
pub mod crawler;
pub mod dedup;
pub mod output;
pub mod proxy;
pub mod source;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Failed to process '{word}': {source}")]
    Word {
        word: String,
        #[source]
        source: Box<HarvestError>,
    },

    #[error("Letter {letter} failed at page {page}: {source}")]
    CrawlPage {
        letter: char,
        page: u32,
        #[source]
        source: Box<HarvestError>,
    },
}

impl HarvestError {
    /// Wraps an error with the word whose processing it interrupted
    pub fn for_word(word: &str, source: impl Into<HarvestError>) -> Self {
        Self::Word {
            word: word.to_string(),
            source: Box::new(source.into()),
        }
    }

    /// Returns true if the site reported its daily lookup limit somewhere in this error
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            Self::Fetch(FetchError::QuotaExceeded { .. }) => true,
            Self::Word { source, .. } | Self::CrawlPage { source, .. } => {
                source.is_quota_exceeded()
            }
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown proxy provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown proxy mode: {0}")]
    UnknownProxyMode(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Errors surfaced by a single page fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// The site served its "daily limit reached" page
    #[error("Daily lookup limit reached while fetching {url}")]
    QuotaExceeded { url: String },

    /// Connection reset, broken pipe, premature EOF, ... on every attempt
    #[error("Transient failure fetching {url} after {attempts} attempts: {message}")]
    Transient {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("HTTP {status} from {url}: {detail}")]
    Status {
        url: String,
        status: u16,
        detail: String,
    },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Entry, Sense};
pub use state::{CrawlCheckpoint, CrawlState};
