//! Resilient single-URL retrieval shared by every source.
//!
//! A fetch checks the TTL cache first. On a miss every configured transport
//! is raced against the URL and the first response that passes the validity
//! check wins; the body is cached before it is returned. Concurrent misses
//! on the same URL coalesce into one race. Failures are never cached and are
//! never retried here: whether a failed fetch is worth another try is the
//! caller's call.

mod race;
mod transport;
mod validate;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use pricemesh_core::{AppConfig, TransportSpec, DEFAULT_USER_AGENT};

use crate::error::{FetchError, ScraperError};
use transport::Transport;

/// Construction parameters for a [`FetchGateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub transports: Vec<TransportSpec>,
    pub user_agent: String,
    /// Budget for one race across all transports.
    pub fetch_timeout: Duration,
    pub min_body_bytes: usize,
    pub cache_ttl: Duration,
    pub cache_max_entries: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            transports: vec![TransportSpec::Direct],
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_timeout: Duration::from_millis(12_000),
            min_body_bytes: 1_000,
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 256,
        }
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            transports: config.transports.clone(),
            user_agent: config.user_agent.clone(),
            fetch_timeout: config.fetch_timeout(),
            min_body_bytes: config.min_body_bytes,
            cache_ttl: config.cache_ttl(),
            cache_max_entries: config.cache_max_entries,
        }
    }
}

/// Fetches search pages through a cache and a transport race.
///
/// Construct once at startup and share behind an `Arc`; the cache is the
/// only state shared between concurrent searches.
pub struct FetchGateway {
    transports: Vec<Transport>,
    cache: Cache<String, Arc<str>>,
    fetch_timeout: Duration,
    min_body_bytes: usize,
    races: AtomicU64,
}

impl std::fmt::Debug for FetchGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchGateway")
            .field(
                "transports",
                &self.transports.iter().map(Transport::label).collect::<Vec<_>>(),
            )
            .field("fetch_timeout", &self.fetch_timeout)
            .field("min_body_bytes", &self.min_body_bytes)
            .finish_non_exhaustive()
    }
}

impl FetchGateway {
    /// Builds one HTTP client per transport.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Transport`] if no transport is configured or
    /// a client cannot be built (e.g. a malformed proxy URL).
    pub fn new(config: GatewayConfig) -> Result<Self, ScraperError> {
        if config.transports.is_empty() {
            return Err(ScraperError::Transport {
                transport: "none",
                reason: "at least one transport must be configured".to_string(),
            });
        }

        let transports = config
            .transports
            .iter()
            .map(|kind| Transport::build(kind, &config.user_agent, config.fetch_timeout))
            .collect::<Result<Vec<_>, _>>()?;

        let cache = Cache::builder()
            .max_capacity(config.cache_max_entries)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            transports,
            cache,
            fetch_timeout: config.fetch_timeout,
            min_body_bytes: config.min_body_bytes,
            races: AtomicU64::new(0),
        })
    }

    /// Returns the page body for `url`, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when no transport produced a valid page
    /// within the fetch timeout.
    pub async fn fetch(&self, url: &str) -> Result<Arc<str>, FetchError> {
        if let Some(body) = self.cache.get(url).await {
            tracing::debug!(url, "fetch cache hit");
            return Ok(body);
        }

        self.cache
            .try_get_with(url.to_string(), self.race(url))
            .await
            .map_err(Arc::unwrap_or_clone)
    }

    /// Drops the cached page for `url`, so the next fetch races again.
    pub async fn invalidate(&self, url: &str) {
        self.cache.invalidate(url).await;
    }

    /// Drops every cached page.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Number of pages currently cached.
    pub async fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    /// Transport races started since construction. Cache hits and coalesced
    /// waiters do not count.
    pub fn races_started(&self) -> u64 {
        self.races.load(Ordering::Relaxed)
    }

    async fn race(&self, url: &str) -> Result<Arc<str>, FetchError> {
        self.races.fetch_add(1, Ordering::Relaxed);
        let deadline = tokio::time::Instant::now() + self.fetch_timeout;

        let attempts = self
            .transports
            .iter()
            .map(|transport| {
                let transport = transport.clone();
                let target = url.to_string();
                let min_body_bytes = self.min_body_bytes;
                (transport.label(), async move {
                    transport.fetch(&target, min_body_bytes).await
                })
            })
            .collect();

        match race::first_ok(attempts, deadline).await {
            Ok((winner, body)) => {
                tracing::debug!(url, transport = winner, bytes = body.len(), "fetch race won");
                Ok(Arc::from(body))
            }
            Err(lost) if lost.timed_out => {
                tracing::debug!(url, failures = %lost.summary(), "fetch race timed out");
                Err(FetchError::Timeout {
                    url: url.to_string(),
                    timeout_ms: self.fetch_timeout.as_millis(),
                    failures: lost.summary(),
                })
            }
            Err(lost) => {
                tracing::debug!(url, failures = %lost.summary(), "every transport failed");
                Err(FetchError::AllTransportsFailed {
                    url: url.to_string(),
                    failures: lost.summary(),
                })
            }
        }
    }
}
