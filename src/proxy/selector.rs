use super::{Provider, ProxyConfig, ProxyMode};
use crate::config::{Credentials, ProxySettings};
use crate::ConfigError;
use reqwest::Proxy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

/// ScrapeOps residential gateway, username carries the egress country
const RESIDENTIAL_GATEWAY: &str = "residential-proxy.scrapeops.io:8181";

/// How the HTTP client must be wired for the selected mode
#[derive(Debug, Clone, PartialEq)]
pub enum Transport {
    /// No proxy at all
    Direct,
    /// Round-robin over residential egress proxies
    Rotating(Vec<Url>),
    /// The provider API fetches on our behalf; the client itself goes direct
    ProviderApi(Provider),
}

/// Resolves target URLs into what is actually requested
///
/// Built once per run from the configuration and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ProxySelector {
    config: ProxyConfig,
    api_key: Option<String>,
    transport: Transport,
}

impl ProxySelector {
    /// A selector that leaves every URL untouched
    pub fn direct() -> Self {
        Self {
            config: ProxyConfig::direct(),
            api_key: None,
            transport: Transport::Direct,
        }
    }

    /// Builds the selector for `config`, pulling keys and endpoints from the settings
    ///
    /// Fails when the credential the mode needs is missing or an endpoint is not a URL.
    pub fn new(
        config: ProxyConfig,
        settings: &ProxySettings,
        credentials: &Credentials,
    ) -> Result<Self, ConfigError> {
        match config.mode {
            ProxyMode::None => Ok(Self::direct()),
            ProxyMode::Residential => {
                let pool = residential_pool(settings, credentials)?;
                Ok(Self {
                    config,
                    api_key: None,
                    transport: Transport::Rotating(pool),
                })
            }
            ProxyMode::Datacenter => {
                let provider = config.provider.unwrap_or(settings.provider);
                let key = credentials
                    .provider_key(provider)
                    .ok_or(ConfigError::MissingCredential(provider.key_name()))?;
                Ok(Self {
                    config: ProxyConfig {
                        mode: ProxyMode::Datacenter,
                        provider: Some(provider),
                    },
                    api_key: Some(key.to_string()),
                    transport: Transport::ProviderApi(provider),
                })
            }
        }
    }

    pub fn config(&self) -> ProxyConfig {
        self.config
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Maps a target URL to the URL that is requested, and the transport to use for it
    pub fn resolve(&self, target: &Url) -> (Url, &Transport) {
        match (&self.transport, self.api_key.as_deref()) {
            (Transport::ProviderApi(provider), Some(key)) => {
                (provider_url(*provider, key, target), &self.transport)
            }
            _ => (target.clone(), &self.transport),
        }
    }

    /// Proxy to install on the HTTP client, if the transport needs one
    ///
    /// Each outgoing connection takes the next endpoint of the pool.
    pub fn client_proxy(&self) -> Option<Proxy> {
        let Transport::Rotating(pool) = &self.transport else {
            return None;
        };
        if pool.is_empty() {
            return None;
        }

        let pool = Arc::new(pool.clone());
        let cursor = Arc::new(AtomicUsize::new(0));
        Some(Proxy::custom(move |_| {
            let index = cursor.fetch_add(1, Ordering::Relaxed) % pool.len();
            Some(pool[index].clone())
        }))
    }
}

fn provider_url(provider: Provider, api_key: &str, target: &Url) -> Url {
    let mut url = match Url::parse(provider.endpoint()) {
        Ok(url) => url,
        // Endpoints are compile-time constants
        Err(_) => return target.clone(),
    };
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("url", target.as_str());
        for (name, value) in provider.query_params(api_key) {
            query.append_pair(name, &value);
        }
    }
    url
}

fn residential_pool(
    settings: &ProxySettings,
    credentials: &Credentials,
) -> Result<Vec<Url>, ConfigError> {
    if !settings.residential_endpoints.is_empty() {
        return settings
            .residential_endpoints
            .iter()
            .map(|endpoint| {
                Url::parse(endpoint).map_err(|e| {
                    ConfigError::InvalidUrl(format!(
                        "Invalid residential endpoint '{}': {}",
                        endpoint, e
                    ))
                })
            })
            .collect();
    }

    let key = credentials
        .provider_key(Provider::ScrapeOps)
        .ok_or(ConfigError::MissingCredential("scrapeops-key"))?;
    let gateway = format!("http://scrapeops.country=jp:{}@{}", key, RESIDENTIAL_GATEWAY);
    let url = Url::parse(&gateway)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid residential gateway: {}", e)))?;
    Ok(vec![url])
}
