//! Response contract for one search and the rules that pick its verdict.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::listings::{MergedProduct, SourceId, SourceOutcome, SourceStatus};

/// Overall verdict of a search, mapped to an HTTP status by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchVerdict {
    /// At least one product was merged, or every source settled without error.
    Ok,
    /// No real products and at least one source failed.
    AllSourcesFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub products: Vec<MergedProduct>,
    pub metadata: BTreeMap<SourceId, SourceOutcome>,
}

impl SearchResponse {
    /// Failure body for errors raised before or outside the fan-out.
    #[must_use]
    pub fn failure(error: impl Into<String>, metadata: BTreeMap<SourceId, SourceOutcome>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            products: Vec::new(),
            metadata,
        }
    }
}

/// Combines merged products and per-source outcomes into the response body.
///
/// Per-source metadata is always included so callers can tell "nothing
/// found" apart from "a source is down".
#[must_use]
pub fn assemble_response(
    products: Vec<MergedProduct>,
    metadata: BTreeMap<SourceId, SourceOutcome>,
) -> (SearchVerdict, SearchResponse) {
    if !products.is_empty() {
        return (
            SearchVerdict::Ok,
            SearchResponse {
                success: true,
                error: None,
                products,
                metadata,
            },
        );
    }

    let failures: Vec<String> = metadata
        .iter()
        .filter(|(_, outcome)| outcome.status == SourceStatus::Failed)
        .map(|(id, outcome)| {
            format!(
                "{id}: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect();

    if failures.is_empty() {
        return (
            SearchVerdict::Ok,
            SearchResponse {
                success: true,
                error: None,
                products,
                metadata,
            },
        );
    }

    (
        SearchVerdict::AllSourcesFailed,
        SearchResponse::failure(
            format!("no source returned results ({})", failures.join("; ")),
            metadata,
        ),
    )
}
