//! Output module for run reports
//!
//! This module handles:
//! - Loading inventory and enrichment counts
//! - Printing statistics, crawl progress and recent runs

pub mod stats;

pub use stats::{load_statistics, print_statistics, run_duration_seconds, HarvestStatistics};
