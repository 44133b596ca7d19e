//! Proxy selection for entry lookups
//!
//! Requests reach the dictionary site in one of three ways:
//! - directly
//! - through a rotating pool of residential HTTP proxies
//! - through a data-center proxy API that fetches the page on our behalf
//!
//! The mode and provider are fixed once per run and read-only afterwards.

mod selector;

pub use selector::{ProxySelector, Transport};

use crate::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How outbound requests reach the target site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// Plain direct requests
    #[default]
    None,
    /// Rotating residential egress proxies
    Residential,
    /// Provider proxy API, request rewritten to the provider endpoint
    Datacenter,
}

impl ProxyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Residential => "residential",
            Self::Datacenter => "datacenter",
        }
    }
}

impl FromStr for ProxyMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "direct" => Ok(Self::None),
            "residential" => Ok(Self::Residential),
            "datacenter" => Ok(Self::Datacenter),
            other => Err(ConfigError::UnknownProxyMode(other.to_string())),
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data-center proxy API providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    ScrapeOps,
    #[default]
    ScrapingAnt,
    ScraperApi,
    ScrapingBee,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::ScrapeOps,
        Provider::ScrapingAnt,
        Provider::ScraperApi,
        Provider::ScrapingBee,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ScrapeOps => "scrapeops",
            Self::ScrapingAnt => "scrapingant",
            Self::ScraperApi => "scraperapi",
            Self::ScrapingBee => "scrapingbee",
        }
    }

    /// Proxy API endpoint the target URL is handed to
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::ScrapeOps => "https://proxy.scrapeops.io/v1/",
            Self::ScrapingAnt => "https://api.scrapingant.com/v2/general",
            Self::ScraperApi => "http://api.scraperapi.com",
            Self::ScrapingBee => "https://app.scrapingbee.com/api/v1/",
        }
    }

    /// Name of the credential holding this provider's API key
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::ScrapeOps => "scrapeops-key",
            Self::ScrapingAnt => "scrapingant-key",
            Self::ScraperApi => "scraperapi-key",
            Self::ScrapingBee => "scrapingbee-key",
        }
    }

    /// Provider-specific query parameters, auth key included
    pub fn query_params(&self, api_key: &str) -> Vec<(&'static str, String)> {
        match self {
            Self::ScrapeOps => vec![
                ("country", "jp".to_string()),
                ("api_key", api_key.to_string()),
            ],
            Self::ScrapingAnt => vec![
                ("browser", "false".to_string()),
                ("proxy_country", "ID".to_string()),
                ("x-api-key", api_key.to_string()),
            ],
            Self::ScraperApi => vec![("api_key", api_key.to_string())],
            Self::ScrapingBee => vec![
                ("render_js", "false".to_string()),
                ("api_key", api_key.to_string()),
            ],
        }
    }

    /// Default (batch size, concurrency) for this provider
    ///
    /// Providers billed per request-second get a single worker.
    pub fn batch_hint(&self) -> (usize, usize) {
        match self {
            Self::ScrapeOps | Self::ScrapingAnt => (10, 1),
            Self::ScraperApi | Self::ScrapingBee => (50, 5),
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownProvider(s.to_string()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Proxy choice for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyConfig {
    pub mode: ProxyMode,
    /// Only meaningful in datacenter mode
    pub provider: Option<Provider>,
}

impl ProxyConfig {
    pub fn direct() -> Self {
        Self {
            mode: ProxyMode::None,
            provider: None,
        }
    }

    /// Provider-driven (batch size, concurrency), for datacenter mode only
    pub fn batch_hint(&self) -> Option<(usize, usize)> {
        match (self.mode, self.provider) {
            (ProxyMode::Datacenter, Some(provider)) => Some(provider.batch_hint()),
            _ => None,
        }
    }
}

impl fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.mode, self.provider) {
            (ProxyMode::Datacenter, Some(provider)) => write!(f, "datacenter ({})", provider),
            (mode, _) => write!(f, "{}", mode),
        }
    }
}
