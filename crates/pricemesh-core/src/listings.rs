//! Request-scoped data model shared by the scraper, deduplicator and HTTP layer.
//!
//! Nothing here is persisted. Every value is created during one search and
//! dropped once the response has been serialized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Image reported for a merged product whose representative listing has none.
pub const PLACEHOLDER_IMAGE_URL: &str = "/images/placeholder.svg";

/// Identifier of one upstream source, e.g. `"freshmart"`.
///
/// Always a non-empty lowercase slug of `[a-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSourceId`] if `raw` is empty or contains
    /// anything other than lowercase ASCII letters, digits, `-` or `_`.
    pub fn new(raw: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(raw))
        } else {
            Err(ConfigError::InvalidSourceId(raw))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SourceId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SourceId> for String {
    fn from(value: SourceId) -> Self {
        value.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location the search is performed for. Both values must be finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Returns `None` if either component is NaN or infinite.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        (latitude.is_finite() && longitude.is_finite()).then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// A listing as an extractor sees it: page content only, no provenance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedListing {
    pub name: String,
    /// Display price exactly as the source renders it, e.g. `"₹32"`.
    pub raw_price: String,
    /// Pack size label such as `"500 ml"`, when the source shows one.
    pub unit: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    /// Placeholder record not derived from real upstream data.
    pub is_synthetic: bool,
}

/// One product record extracted from one source's search-result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    pub name: String,
    pub raw_price: String,
    pub unit: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub source_id: SourceId,
    /// Zero-based discovery index on the source's result page.
    pub position: usize,
    pub is_synthetic: bool,
}

impl RawListing {
    /// Stamps provenance onto an extracted listing.
    #[must_use]
    pub fn from_extracted(extracted: ExtractedListing, source_id: SourceId, position: usize) -> Self {
        Self {
            name: extracted.name,
            raw_price: extracted.raw_price,
            unit: extracted.unit,
            url: extracted.url,
            image_url: extracted.image_url,
            source_id,
            position,
            is_synthetic: extracted.is_synthetic,
        }
    }

    /// Returns `true` when the listing carries a non-blank image URL.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    #[must_use]
    pub fn price_detail(&self) -> PriceDetail {
        PriceDetail {
            raw_price: self.raw_price.clone(),
            unit: self.unit.clone(),
            url: self.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceStatus {
    Success,
    NoResults,
    Failed,
}

/// What happened to one source during one search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOutcome {
    pub status: SourceStatus,
    /// Listings the source returned, before synthetic filtering.
    pub listing_count: usize,
    /// Listings dropped because they were flagged synthetic.
    pub synthetic_count: usize,
    /// Fetch+extract attempts that ran.
    pub attempts: u32,
    pub error: Option<String>,
    pub request_url: Option<String>,
}

impl SourceOutcome {
    /// Derives the status from the listing count and the last observed error.
    ///
    /// Listings win over errors: a source that failed once and then returned
    /// listings on retry is a success.
    #[must_use]
    pub fn settle(
        listing_count: usize,
        synthetic_count: usize,
        attempts: u32,
        error: Option<String>,
        request_url: Option<String>,
    ) -> Self {
        let (status, error) = if listing_count > 0 {
            (SourceStatus::Success, None)
        } else if error.is_some() {
            (SourceStatus::Failed, error)
        } else {
            (SourceStatus::NoResults, None)
        };
        Self {
            status,
            listing_count,
            synthetic_count,
            attempts,
            error,
            request_url,
        }
    }

    /// Outcome for a source that had not settled when the search deadline hit.
    #[must_use]
    pub fn timed_out(deadline: std::time::Duration, request_url: Option<String>) -> Self {
        Self {
            status: SourceStatus::Failed,
            listing_count: 0,
            synthetic_count: 0,
            attempts: 0,
            error: Some(format!(
                "timed out after {}ms search deadline",
                deadline.as_millis()
            )),
            request_url,
        }
    }

    /// Listings that survive synthetic filtering.
    #[must_use]
    pub fn real_listing_count(&self) -> usize {
        self.listing_count.saturating_sub(self.synthetic_count)
    }
}

/// Price data one source reported for a merged product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDetail {
    pub raw_price: String,
    pub unit: Option<String>,
    pub url: Option<String>,
}

/// One deduplicated catalog entry.
///
/// `prices` always holds one key per configured source; sources that did not
/// list the product map to `None`. At least one entry is `Some`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedProduct {
    pub id: String,
    pub canonical_name: String,
    pub image_url: String,
    pub prices: BTreeMap<SourceId, Option<PriceDetail>>,
}

impl MergedProduct {
    /// Number of sources with a price for this product.
    #[must_use]
    pub fn populated_sources(&self) -> usize {
        self.prices.values().filter(|p| p.is_some()).count()
    }
}
