//! Browser-like request headers
//!
//! Every entry request carries one header set picked at random from a pool,
//! plus a fixed set of politeness headers. The pool comes from the ScrapeOps
//! browser-headers service when a key is configured; otherwise (or when that
//! service fails) a single built-in browser set is used.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Browser-headers service queried once at start-up
pub const HEADER_POOL_URL: &str = "http://headers.scrapeops.io/v1/browser-headers";

const POOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Attached to every request, after the pooled set
pub const POLITENESS_HEADERS: [(&str, &str); 5] = [
    ("accept-language", "en-US,en;q=0.9"),
    ("cache-control", "no-cache"),
    ("pragma", "no-cache"),
    ("dnt", "1"),
    ("upgrade-insecure-requests", "1"),
];

const DEFAULT_BROWSER_HEADERS: [(&str, &str); 2] = [
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    ),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
];

#[derive(Debug, Deserialize)]
struct PoolResponse {
    #[serde(default)]
    result: Vec<HashMap<String, String>>,
}

/// Read-only pool of header sets for one run
#[derive(Debug, Clone)]
pub struct HeaderPool {
    sets: Vec<HeaderMap>,
}

impl Default for HeaderPool {
    fn default() -> Self {
        Self::fixed()
    }
}

impl HeaderPool {
    /// The built-in browser set only
    pub fn fixed() -> Self {
        Self {
            sets: vec![to_header_map(DEFAULT_BROWSER_HEADERS.iter().copied())],
        }
    }

    /// Builds the pool for a run
    ///
    /// Without an API key, or when the service cannot be used, this falls
    /// back to the built-in set.
    pub async fn load(client: &Client, endpoint: &str, api_key: Option<&str>) -> Self {
        let Some(key) = api_key else {
            tracing::debug!("No header pool key configured, using default browser headers");
            return Self::fixed();
        };

        match fetch_sets(client, endpoint, key).await {
            Ok(sets) if !sets.is_empty() => {
                tracing::info!("Loaded {} browser header sets", sets.len());
                Self { sets }
            }
            Ok(_) => {
                tracing::warn!("Header pool returned no header sets, using defaults");
                Self::fixed()
            }
            Err(e) => {
                tracing::warn!("Failed to load header pool: {}, using defaults", e);
                Self::fixed()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// A random pooled set with the politeness headers applied on top
    pub fn pick(&self) -> HeaderMap {
        let mut headers = if self.sets.is_empty() {
            HeaderMap::new()
        } else {
            self.sets[fastrand::usize(..self.sets.len())].clone()
        };
        headers.extend(to_header_map(POLITENESS_HEADERS.iter().copied()));
        headers
    }
}

async fn fetch_sets(
    client: &Client,
    endpoint: &str,
    api_key: &str,
) -> Result<Vec<HeaderMap>, reqwest::Error> {
    let response: PoolResponse = client
        .get(endpoint)
        .query(&[("api_key", api_key)])
        .timeout(POOL_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(response
        .result
        .iter()
        .map(|set| to_header_map(set.iter().map(|(k, v)| (k.as_str(), v.as_str()))))
        .filter(|map| !map.is_empty())
        .collect())
}

/// Invalid names or values are dropped
fn to_header_map<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> HeaderMap {
    pairs
        .filter_map(|(name, value)| {
            let name = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()).ok()?;
            let value = HeaderValue::from_str(value).ok()?;
            Some((name, value))
        })
        .collect()
}
