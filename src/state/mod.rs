//! Crawl progress and side files
//!
//! # Components
//!
//! - `CrawlState`: per-letter state machine of the alphabet index crawl
//! - `CheckpointStore`: resume point of the crawl, kept on disk
//! - `NoResultStore`: words already confirmed to have no entry

mod checkpoint;
mod crawl_state;
mod no_result;

// Re-export main types
pub use checkpoint::{CheckpointStore, CrawlCheckpoint, LetterProgress};
pub use crawl_state::CrawlState;
pub use no_result::{NoResultRecord, NoResultStore};
