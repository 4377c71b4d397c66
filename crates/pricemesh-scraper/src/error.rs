use thiserror::Error;

/// Failure of one gateway fetch after every transport was tried.
///
/// `Clone` so a single failed race can be handed to every caller that was
/// waiting on the same URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("no transport returned a valid page for {url} within {timeout_ms}ms ({failures})")]
    Timeout {
        url: String,
        timeout_ms: u128,
        failures: String,
    },

    #[error("every transport failed for {url}: {failures}")]
    AllTransportsFailed { url: String, failures: String },
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("no listings extracted from {url}")]
    ExtractionEmpty { url: String },

    #[error("invalid search URL for source {source_id}: {reason}")]
    InvalidSearchUrl { source_id: String, reason: String },

    #[error("invalid {transport} transport: {reason}")]
    Transport {
        transport: &'static str,
        reason: String,
    },
}

impl ScraperError {
    /// `true` for the ambiguous "page fetched but nothing extracted" case,
    /// which is retried but does not by itself mark a source as failed.
    #[must_use]
    pub fn is_extraction_empty(&self) -> bool {
        matches!(self, ScraperError::ExtractionEmpty { .. })
    }
}

/// Unexpected faults in the search fan-out itself.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no sources configured")]
    NoSources,

    #[error("source task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Scraper(#[from] ScraperError),
}
