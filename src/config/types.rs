use crate::proxy::{ProxyMode, Provider};
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub enrich: EnrichConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub proxy: ProxySettings,
    #[serde(default)]
    pub credentials: Credentials,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host of the dictionary site, without a trailing path
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Hard timeout for a single request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Where results and side files are written
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the alphabet crawl checkpoint (JSON)
    #[serde(rename = "checkpoint-path", default = "default_checkpoint_path")]
    pub checkpoint_path: String,

    /// Path to the list of words confirmed to have no entry (JSON)
    #[serde(rename = "no-result-path", default = "default_no_result_path")]
    pub no_result_path: String,
}

/// Enrichment run settings
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichConfig {
    /// Newline-delimited word list used when the source is a local file
    #[serde(rename = "wordlist-path", default = "default_wordlist_path")]
    pub wordlist_path: String,

    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum number of words in flight across the whole run
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Attempts per word before a transient failure is surfaced
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(rename = "retry-delay-secs", default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            wordlist_path: default_wordlist_path(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

/// Alphabet index harvest settings
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Maximum number of letters crawled at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Letters to walk, in order
    #[serde(default = "default_letters")]
    pub letters: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            letters: default_letters(),
        }
    }
}

/// How outbound entry lookups reach the site
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySettings {
    #[serde(default)]
    pub mode: ProxyMode,

    /// Proxy-API provider used in datacenter mode
    #[serde(default)]
    pub provider: Provider,

    /// Accept TLS certificates re-signed by an intercepting proxy
    #[serde(rename = "accept-invalid-certs", default)]
    pub accept_invalid_certs: bool,

    /// Residential egress proxies; defaults to the ScrapeOps pool when empty
    #[serde(rename = "residential-endpoints", default)]
    pub residential_endpoints: Vec<String>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            mode: ProxyMode::None,
            provider: Provider::default(),
            accept_invalid_certs: false,
            residential_endpoints: Vec::new(),
        }
    }
}

/// Provider keys and site credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(rename = "scrapeops-key")]
    pub scrapeops_key: Option<String>,

    #[serde(rename = "scrapingant-key")]
    pub scrapingant_key: Option<String>,

    #[serde(rename = "scraperapi-key")]
    pub scraperapi_key: Option<String>,

    #[serde(rename = "scrapingbee-key")]
    pub scrapingbee_key: Option<String>,

    /// Account e-mail for the site login
    pub email: Option<String>,

    pub password: Option<String>,
}

impl Credentials {
    /// API key configured for a proxy provider
    pub fn provider_key(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::ScrapeOps => &self.scrapeops_key,
            Provider::ScrapingAnt => &self.scrapingant_key,
            Provider::ScraperApi => &self.scraperapi_key,
            Provider::ScrapingBee => &self.scrapingbee_key,
        };
        key.as_deref().filter(|k| !k.is_empty())
    }

    /// Login pair, when both halves are present
    pub fn login(&self) -> Option<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            _ => None,
        }
    }
}

fn default_base_url() -> String {
    "https://kbbi.kemdikbud.go.id".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_checkpoint_path() -> String {
    "./scrape_progress.json".to_string()
}

fn default_no_result_path() -> String {
    "./no_result_word.json".to_string()
}

fn default_wordlist_path() -> String {
    "./word.txt".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_concurrency() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

fn default_letters() -> String {
    ('A'..='Z').collect()
}
