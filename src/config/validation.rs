use crate::config::types::{
    Config, EnrichConfig, HarvestConfig, ProxySettings, SiteConfig, StorageConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_storage_config(&config.storage)?;
    validate_enrich_config(&config.enrich)?;
    validate_harvest_config(&config.harvest)?;
    validate_proxy_settings(&config.proxy)?;
    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("database-path", &config.database_path),
        ("checkpoint-path", &config.checkpoint_path),
        ("no-result-path", &config.no_result_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }
    Ok(())
}

fn validate_enrich_config(config: &EnrichConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    validate_concurrency("enrich.concurrency", config.concurrency)?;

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    validate_concurrency("harvest.concurrency", config.concurrency)?;

    if config.letters.is_empty() {
        return Err(ConfigError::Validation(
            "harvest.letters cannot be empty".to_string(),
        ));
    }

    if let Some(bad) = config.letters.chars().find(|c| !c.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(format!(
            "harvest.letters may only contain A-Z, got '{}'",
            bad
        )));
    }

    Ok(())
}

/// Checks the proxy endpoints parse as URLs
///
/// Credentials for the proxy mode are checked when the selector is built,
/// once command-line overrides have been applied.
fn validate_proxy_settings(proxy: &ProxySettings) -> Result<(), ConfigError> {
    for endpoint in &proxy.residential_endpoints {
        Url::parse(endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid residential endpoint '{}': {}", endpoint, e))
        })?;
    }
    Ok(())
}

fn validate_concurrency(name: &str, value: usize) -> Result<(), ConfigError> {
    if !(1..=100).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and 100, got {}",
            name, value
        )));
    }
    Ok(())
}
