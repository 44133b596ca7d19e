use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variables consulted for secrets missing from the file
const ENV_SCRAPE_OPS: &str = "SCRAPE_OPS";
const ENV_SCRAPING_ANT: &str = "SCRAPING_ANT";
const ENV_SCRAPER_API: &str = "SCRAPER_API";
const ENV_SCRAPING_BEE: &str = "SCRAPING_BEE";
const ENV_EMAIL: &str = "KBBI_EMAIL";
const ENV_PASSWORD: &str = "KBBI_PASSWORD";

/// Loads and parses a configuration file from the given path
///
/// Secrets absent from the file are looked up in the process environment
/// before validation runs.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;

    apply_secret_fallbacks(&mut config, |name| std::env::var(name).ok());

    validate(&config)?;

    Ok(config)
}

/// Parses TOML content into a configuration without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Fills unset credentials through `lookup` (normally the process environment)
///
/// Values present in the file always win; empty lookups are ignored.
pub fn apply_secret_fallbacks<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let creds = &mut config.credentials;
    let slots: [(&mut Option<String>, &str); 6] = [
        (&mut creds.scrapeops_key, ENV_SCRAPE_OPS),
        (&mut creds.scrapingant_key, ENV_SCRAPING_ANT),
        (&mut creds.scraperapi_key, ENV_SCRAPER_API),
        (&mut creds.scrapingbee_key, ENV_SCRAPING_BEE),
        (&mut creds.email, ENV_EMAIL),
        (&mut creds.password, ENV_PASSWORD),
    ];

    for (slot, name) in slots {
        if slot.as_deref().map_or(true, str::is_empty) {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                *slot = Some(value);
            }
        }
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is stored with every run so runs made under different settings
/// can be told apart.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
