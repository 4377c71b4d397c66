//! Concurrent fan-out of one search across every configured source.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use pricemesh_core::{
    AppConfig, Coordinates, MergedProduct, RawListing, SourceId, SourceOutcome, SourcesFile,
};
use pricemesh_dedup::Deduplicator;
use tokio::task::JoinSet;

use crate::error::OrchestratorError;
use crate::gateway::{FetchGateway, GatewayConfig};
use crate::retry::RetryPolicy;
use crate::source::{Retrieval, SourceClient};

/// Merged products plus one outcome per configured source.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub products: Vec<MergedProduct>,
    pub metadata: BTreeMap<SourceId, SourceOutcome>,
}

/// Runs every source concurrently, waits for all of them (or the deadline),
/// and merges what came back.
#[derive(Debug)]
pub struct Orchestrator {
    /// In priority order.
    clients: Vec<Arc<SourceClient>>,
    dedup: Deduplicator,
    deadline: Duration,
}

impl Orchestrator {
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NoSources`] if `clients` is empty.
    pub fn new(mut clients: Vec<SourceClient>, deadline: Duration) -> Result<Self, OrchestratorError> {
        if clients.is_empty() {
            return Err(OrchestratorError::NoSources);
        }
        clients.sort_by_key(SourceClient::priority);

        let dedup = Deduplicator::new(clients.iter().map(|c| c.id().clone()).collect());
        Ok(Self {
            clients: clients.into_iter().map(Arc::new).collect(),
            dedup,
            deadline,
        })
    }

    /// Wires one shared gateway and a client per registry entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway cannot be built or no source is
    /// configured.
    pub fn from_config(config: &AppConfig, sources: &SourcesFile) -> Result<Self, OrchestratorError> {
        let gateway = Arc::new(FetchGateway::new(GatewayConfig::from_app_config(config))?);
        let retry = RetryPolicy::new(config.max_attempts, config.backoff_base());

        let clients = sources
            .sources
            .iter()
            .map(|source| SourceClient::from_config(source.clone(), Arc::clone(&gateway), retry))
            .collect();

        Self::new(clients, config.search_deadline())
    }

    /// Configured source ids, in priority order.
    #[must_use]
    pub fn source_ids(&self) -> &[SourceId] {
        self.dedup.sources()
    }

    /// Searches every source for `query` near `coords`.
    ///
    /// Source failures never fail the search; they are recorded in
    /// `metadata`. Sources still running at the deadline are recorded as
    /// failed and their tasks aborted.
    ///
    /// A source that panics is recorded as failed like any other source
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::TaskFailed`] if a source task could not
    /// be joined.
    pub async fn search(
        &self,
        query: &str,
        coords: Coordinates,
    ) -> Result<SearchOutcome, OrchestratorError> {
        let deadline = tokio::time::Instant::now() + self.deadline;
        let mut set = JoinSet::new();
        for (idx, client) in self.clients.iter().enumerate() {
            let client = Arc::clone(client);
            let query = query.to_string();
            set.spawn(async move {
                let retrieval = AssertUnwindSafe(client.retrieve_detailed(&query, coords))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        tracing::error!(source = %client.id(), panic = %message, "source task panicked");
                        Retrieval {
                            listings: Vec::new(),
                            attempts: 1,
                            error: Some(format!("source task panicked: {message}")),
                            request_url: client.search_url(&query, coords).ok(),
                        }
                    });
                (idx, retrieval)
            });
        }

        let mut settled: Vec<Option<Retrieval>> = self.clients.iter().map(|_| None).collect();
        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((idx, retrieval)))) => settled[idx] = Some(retrieval),
                Ok(Some(Err(join_err))) => {
                    set.abort_all();
                    return Err(OrchestratorError::TaskFailed(join_err.to_string()));
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        pending = set.len(),
                        deadline_ms = self.deadline.as_millis(),
                        "search deadline reached; abandoning pending sources"
                    );
                    set.abort_all();
                    break;
                }
            }
        }

        let mut metadata = BTreeMap::new();
        let mut real: Vec<RawListing> = Vec::new();

        for (client, slot) in self.clients.iter().zip(settled) {
            let outcome = match slot {
                Some(retrieval) => {
                    let listing_count = retrieval.listings.len();
                    let (synthetic, genuine): (Vec<RawListing>, Vec<RawListing>) = retrieval
                        .listings
                        .into_iter()
                        .partition(|listing| listing.is_synthetic);
                    if !synthetic.is_empty() {
                        tracing::warn!(
                            source = %client.id(),
                            synthetic = synthetic.len(),
                            "dropping placeholder listings"
                        );
                    }
                    real.extend(genuine);
                    SourceOutcome::settle(
                        listing_count,
                        synthetic.len(),
                        retrieval.attempts,
                        retrieval.error,
                        retrieval.request_url,
                    )
                }
                None => SourceOutcome::timed_out(self.deadline, client.search_url(query, coords).ok()),
            };
            metadata.insert(client.id().clone(), outcome);
        }

        let products = if real.is_empty() {
            Vec::new()
        } else {
            self.dedup.merge(real)
        };

        tracing::info!(
            sources = metadata.len(),
            products = products.len(),
            "search complete"
        );

        Ok(SearchOutcome { products, metadata })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
