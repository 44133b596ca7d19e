//! HTTP fetcher for entry pages
//!
//! This module handles all entry lookups, including:
//! - Building the HTTP client for the selected proxy transport
//! - Rewriting the request URL through the proxy selector
//! - Randomized browser headers
//! - Retry on transient network faults
//! - Daily-limit and not-found detection

use crate::config::Config;
use crate::crawler::headers::{HeaderPool, HEADER_POOL_URL};
use crate::crawler::parser::{classify_entry_page, Entry, EntryPage};
use crate::crawler::retry::{RetryFailure, RetryPolicy};
use crate::proxy::{Provider, ProxyConfig, ProxySelector};
use crate::{FetchError, HarvestError};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{redirect::Policy, Client};
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Message fragments of faults worth another attempt
const TRANSIENT_MESSAGES: [&str; 5] = [
    "eof",
    "connection reset",
    "broken pipe",
    "use of closed network connection",
    "connection closed before message completed",
];

/// Looks up the entries of one headword
///
/// The batch scheduler only depends on this seam, so tests can drive it
/// without a network.
#[async_trait]
pub trait EntryLookup: Send + Sync {
    /// Entries for `word`; an empty list means the site has no entry for it
    async fn lookup(&self, word: &str) -> Result<Vec<Entry>, FetchError>;

    /// Public URL of the entry page for `word`
    fn entry_url(&self, word: &str) -> String;
}

/// Builds an HTTP client for entry lookups
///
/// # Arguments
///
/// * `timeout` - Hard timeout for a single request
/// * `selector` - Proxy selector; a rotating transport installs a proxy on the client
/// * `accept_invalid_certs` - Accept certificates re-signed by an intercepting proxy
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    timeout: Duration,
    selector: &ProxySelector,
    accept_invalid_certs: bool,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = selector.client_proxy() {
        builder = builder.proxy(proxy);
    }

    builder.build()
}

/// `base` with `segments` appended to its path, each percent-encoded as one segment
pub fn site_url(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// URL of the entry page for `word` under `base`
pub fn entry_url(base: &Url, word: &str) -> Url {
    site_url(base, &["entri", word])
}

/// Returns true if `err`, or anything in its source chain, is a transient network fault
///
/// Covers connection resets, broken pipes, premature end of stream and reuse
/// of a connection the peer already closed.
pub fn is_transient_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }

        // reqwest messages embed the request URL, which may contain anything
        if e.downcast_ref::<reqwest::Error>().is_none() {
            let message = e.to_string().to_lowercase();
            if TRANSIENT_MESSAGES.iter().any(|m| message.contains(m)) {
                return true;
            }
        }

        current = e.source();
    }
    false
}

/// The `detail` field of a JSON error body, or the body itself
fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value.get("detail").map(|detail| match detail.as_str() {
                Some(text) => text.to_string(),
                None => detail.to_string(),
            })
        });

    detail.unwrap_or_else(|| body.trim().chars().take(200).collect())
}

/// One failed attempt, before the retry policy decides what to do with it
#[derive(Debug, Error)]
enum AttemptError {
    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Fatal(FetchError),
}

impl AttemptError {
    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        // the request URL may carry a provider API key
        let err = err.without_url();
        if is_transient_error(&err) {
            Self::Transient(err.to_string())
        } else {
            Self::Fatal(FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            })
        }
    }
}

/// GETs `request_url` under `retry`, returning the body of a 2xx response
///
/// Only transient network faults are retried. Errors name `public_url`,
/// never the request URL, which may carry a provider API key.
pub(crate) async fn fetch_body<H>(
    client: &Client,
    request_url: &Url,
    public_url: &str,
    headers: H,
    retry: &RetryPolicy,
) -> Result<String, FetchError>
where
    H: Fn() -> HeaderMap,
{
    retry
        .run(
            |_| fetch_once(client, request_url, public_url, headers()),
            |e| matches!(e, AttemptError::Transient(_)),
        )
        .await
        .map_err(|failure| match failure {
            RetryFailure::Fatal(AttemptError::Fatal(e)) => e,
            RetryFailure::Fatal(AttemptError::Transient(message)) => FetchError::Transport {
                url: public_url.to_string(),
                message,
            },
            RetryFailure::Exhausted { last, attempts } => FetchError::Transient {
                url: public_url.to_string(),
                attempts,
                message: last.to_string(),
            },
        })
}

async fn fetch_once(
    client: &Client,
    request_url: &Url,
    public_url: &str,
    headers: HeaderMap,
) -> Result<String, AttemptError> {
    let response = client
        .get(request_url.clone())
        .headers(headers)
        .send()
        .await
        .map_err(|e| AttemptError::from_reqwest(public_url, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AttemptError::Fatal(FetchError::Status {
            url: public_url.to_string(),
            status: status.as_u16(),
            detail: error_detail(&body),
        }));
    }

    let body = response
        .text()
        .await
        .map_err(|e| AttemptError::from_reqwest(public_url, e))?;

    if body.is_empty() {
        tracing::warn!("Received empty body with status {} for {}", status, public_url);
    }

    Ok(body)
}

/// Fetches and parses entry pages
pub struct EntryFetcher {
    client: Client,
    base_url: Url,
    selector: ProxySelector,
    headers: HeaderPool,
    retry: RetryPolicy,
}

impl EntryFetcher {
    pub fn new(
        client: Client,
        base_url: Url,
        selector: ProxySelector,
        headers: HeaderPool,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url,
            selector,
            headers,
            retry,
        }
    }

    /// Builds a fetcher for one run: proxy selector, client and header pool
    ///
    /// Fails before any entry request when the proxy choice lacks its credentials.
    pub async fn from_config(config: &Config, proxy: ProxyConfig) -> Result<Self, HarvestError> {
        let selector = ProxySelector::new(proxy, &config.proxy, &config.credentials)?;
        let client = build_http_client(
            Duration::from_secs(config.site.request_timeout_secs),
            &selector,
            config.proxy.accept_invalid_certs,
        )?;
        let base_url = Url::parse(&config.site.base_url)?;

        let headers = HeaderPool::load(
            &Client::new(),
            HEADER_POOL_URL,
            config.credentials.provider_key(Provider::ScrapeOps),
        )
        .await;

        let retry = RetryPolicy::new(
            config.enrich.max_retries,
            Duration::from_secs(config.enrich.retry_delay_secs),
        );

        tracing::info!("Entry lookups go through proxy mode: {}", selector.config());

        Ok(Self::new(client, base_url, selector, headers, retry))
    }

    /// Fetches the entry page of `word` and parses it
    ///
    /// # Outcomes
    ///
    /// | Page / fault | Result |
    /// |--------------|--------|
    /// | daily-limit page | `FetchError::QuotaExceeded`, no retry |
    /// | not-found page | `Ok(vec![])` |
    /// | entry page | `Ok(entries)`, possibly empty |
    /// | transient fault on every attempt | `FetchError::Transient` |
    /// | non-2xx status | `FetchError::Status` |
    /// | other transport error | `FetchError::Transport` |
    pub async fn fetch(&self, word: &str) -> Result<Vec<Entry>, FetchError> {
        let target = entry_url(&self.base_url, word);
        let (request_url, _) = self.selector.resolve(&target);
        let public_url = target.to_string();

        let body = fetch_body(
            &self.client,
            &request_url,
            &public_url,
            || self.headers.pick(),
            &self.retry,
        )
        .await?;

        match classify_entry_page(&body) {
            EntryPage::QuotaExceeded => Err(FetchError::QuotaExceeded { url: public_url }),
            EntryPage::NotFound => {
                tracing::debug!("Site reports no entry for '{}'", word);
                Ok(Vec::new())
            }
            EntryPage::Entries(entries) => Ok(entries),
        }
    }
}

#[async_trait]
impl EntryLookup for EntryFetcher {
    async fn lookup(&self, word: &str) -> Result<Vec<Entry>, FetchError> {
        self.fetch(word).await
    }

    fn entry_url(&self, word: &str) -> String {
        entry_url(&self.base_url, word).to_string()
    }
}
