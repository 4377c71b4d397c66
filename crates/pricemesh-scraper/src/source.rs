//! One source's fetch-and-extract unit, with retry around the whole unit.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use pricemesh_core::{Coordinates, RawListing, SourceConfig, SourceId};

use crate::error::ScraperError;
use crate::extract::{extractor_for, Extractor};
use crate::gateway::FetchGateway;
use crate::retry::RetryPolicy;

/// Everything one retrieval observed, for the orchestrator's bookkeeping.
#[derive(Debug)]
pub struct Retrieval {
    /// Listings from the successful attempt, or empty.
    pub listings: Vec<RawListing>,
    pub attempts: u32,
    /// Most recent hard error observed across all attempts. Empty-extraction
    /// results are not hard errors: on their own they mean "no results".
    pub error: Option<String>,
    pub request_url: Option<String>,
}

/// Searches one source through the shared gateway.
pub struct SourceClient {
    config: SourceConfig,
    gateway: Arc<FetchGateway>,
    extractor: Arc<dyn Extractor>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for SourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceClient")
            .field("source", &self.config.id)
            .field("extractor", &self.config.extractor)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl SourceClient {
    #[must_use]
    pub fn new(
        config: SourceConfig,
        gateway: Arc<FetchGateway>,
        extractor: Arc<dyn Extractor>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            config,
            gateway,
            extractor,
            retry,
        }
    }

    /// Client using the built-in extractor named in the registry entry.
    #[must_use]
    pub fn from_config(config: SourceConfig, gateway: Arc<FetchGateway>, retry: RetryPolicy) -> Self {
        let extractor = extractor_for(config.extractor);
        Self::new(config, gateway, extractor, retry)
    }

    #[must_use]
    pub fn id(&self) -> &SourceId {
        &self.config.id
    }

    #[must_use]
    pub fn priority(&self) -> u32 {
        self.config.priority
    }

    /// Renders the source's search URL for `query` at `coords`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSearchUrl`] if the rendered template is
    /// not an absolute http(s) URL.
    pub fn search_url(&self, query: &str, coords: Coordinates) -> Result<String, ScraperError> {
        render_search_url(&self.config, query, coords)
    }

    /// Listings for `query`, or an empty list. Never fails: errors are
    /// logged here and surfaced only through [`Self::retrieve_detailed`].
    pub async fn retrieve(&self, query: &str, coords: Coordinates) -> Vec<RawListing> {
        self.retrieve_detailed(query, coords).await.listings
    }

    /// Runs fetch+extract under the retry policy and reports what happened.
    ///
    /// An attempt fails with [`ScraperError::ExtractionEmpty`] when the page
    /// fetched fine but yielded no listings; that is retried like a fetch
    /// failure because it is usually a soft block.
    pub async fn retrieve_detailed(&self, query: &str, coords: Coordinates) -> Retrieval {
        let url = match self.search_url(query, coords) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(source = %self.config.id, error = %e, "cannot build search URL");
                return Retrieval {
                    listings: Vec::new(),
                    attempts: 0,
                    error: Some(e.to_string()),
                    request_url: None,
                };
            }
        };

        tracing::debug!(source = %self.config.id, url = %url, query, "searching source");

        let outcome = self
            .retry
            .run(self.config.id.as_str(), |_| self.attempt(&url, query))
            .await;

        let hard_error = std::iter::once(outcome.result.as_ref().err())
            .flatten()
            .chain(outcome.failures.iter().rev())
            .find(|e| !e.is_extraction_empty())
            .map(ToString::to_string);

        let listings = match outcome.result {
            Ok(listings) => {
                tracing::debug!(
                    source = %self.config.id,
                    listings = listings.len(),
                    attempts = outcome.attempts,
                    "source returned listings"
                );
                listings
            }
            Err(e) => {
                tracing::warn!(
                    source = %self.config.id,
                    attempts = outcome.attempts,
                    error = %e,
                    "source gave up"
                );
                Vec::new()
            }
        };

        // Listings win: an error on an earlier attempt does not fail a
        // source that recovered.
        let error = if listings.is_empty() { hard_error } else { None };

        Retrieval {
            listings,
            attempts: outcome.attempts,
            error,
            request_url: Some(url),
        }
    }

    async fn attempt(&self, url: &str, query: &str) -> Result<Vec<RawListing>, ScraperError> {
        let html = self.gateway.fetch(url).await?;
        let extracted = self.extractor.extract(&html, query);
        if extracted.is_empty() {
            // A listing-free page is often a soft block; keep it out of the
            // cache so the retry goes back to the network.
            self.gateway.invalidate(url).await;
            return Err(ScraperError::ExtractionEmpty {
                url: url.to_string(),
            });
        }

        Ok(extracted
            .into_iter()
            .enumerate()
            .map(|(position, listing)| {
                RawListing::from_extracted(listing, self.config.id.clone(), position)
            })
            .collect())
    }
}

/// Substitutes `{query}` (percent-encoded), `{lat}` and `{lon}` (six
/// decimals) into the source's template.
pub(crate) fn render_search_url(
    config: &SourceConfig,
    query: &str,
    coords: Coordinates,
) -> Result<String, ScraperError> {
    let encoded = utf8_percent_encode(query.trim(), NON_ALPHANUMERIC).to_string();
    let url = config
        .search_url
        .trim()
        .replace("{query}", &encoded)
        .replace("{lat}", &format!("{:.6}", coords.latitude))
        .replace("{lon}", &format!("{:.6}", coords.longitude));

    let invalid = |reason: String| ScraperError::InvalidSearchUrl {
        source_id: config.id.to_string(),
        reason,
    };
    let parsed = reqwest::Url::parse(&url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    Ok(url)
}
