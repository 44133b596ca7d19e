//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Secrets left out of the file are filled in from the process environment once,
//! at load time, so the rest of the crate only ever sees an explicit [`Config`].
//!
//! # Example
//!
//! ```no_run
//! use kbbi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Enrichment batch size: {}", config.enrich.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, Credentials, EnrichConfig, HarvestConfig, ProxySettings, SiteConfig, StorageConfig,
};

// Re-export parser functions
pub use parser::{
    apply_secret_fallbacks, compute_config_hash, load_config, load_config_with_hash,
    parse_config,
};
pub use validation::validate;
