//! Greedy clustering of listings into merged products.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use pricemesh_core::{MergedProduct, RawListing, SourceId, PLACEHOLDER_IMAGE_URL};
use sha2::{Digest, Sha256};

use crate::normalize::normalize_name;
use crate::similarity::similarity;

/// Minimum similarity for two listings to land in the same cluster.
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 0.7;

/// Similarity above which two names count as the "same wording" when
/// picking a representative, so the shorter one wins.
pub const DEFAULT_NAME_TIE_THRESHOLD: f64 = 0.9;

/// Clusters same-product listings from different sources.
///
/// Built once per configured source set. `sources` must be in priority
/// order; that order drives the stable processing order and every merged
/// product carries exactly these keys in `prices`.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    sources: Vec<SourceId>,
    cluster_threshold: f64,
    name_tie_threshold: f64,
}

/// A listing paired with its normalized name.
struct Entry {
    listing: RawListing,
    normalized: String,
    priority: usize,
}

impl Deduplicator {
    #[must_use]
    pub fn new(sources: Vec<SourceId>) -> Self {
        Self {
            sources,
            cluster_threshold: DEFAULT_CLUSTER_THRESHOLD,
            name_tie_threshold: DEFAULT_NAME_TIE_THRESHOLD,
        }
    }

    #[must_use]
    pub fn sources(&self) -> &[SourceId] {
        &self.sources
    }

    /// Merges listings into products.
    ///
    /// Deterministic for a given listing set: listings are first sorted by
    /// source priority, then discovery position, then content, so the
    /// caller's input order does not affect the result.
    ///
    /// Listings from sources outside the configured set are dropped.
    #[must_use]
    pub fn merge(&self, listings: Vec<RawListing>) -> Vec<MergedProduct> {
        let entries = self.ordered_entries(listings);
        let mut processed: HashSet<&str> = HashSet::new();
        let mut products = Vec::new();

        for (seed_idx, seed) in entries.iter().enumerate() {
            if processed.contains(seed.normalized.as_str()) {
                continue;
            }

            let members: Vec<&Entry> = std::iter::once(seed)
                .chain(entries[seed_idx + 1..].iter().filter(|candidate| {
                    !processed.contains(candidate.normalized.as_str())
                        && similarity(&seed.normalized, &candidate.normalized)
                            >= self.cluster_threshold
                }))
                .collect();

            for member in &members {
                processed.insert(member.normalized.as_str());
            }

            products.push(self.build_product(products.len(), &members));
        }

        tracing::debug!(
            listings = entries.len(),
            products = products.len(),
            "merged listings into products"
        );

        products
    }

    fn ordered_entries(&self, listings: Vec<RawListing>) -> Vec<Entry> {
        let priorities: HashMap<&SourceId, usize> = self
            .sources
            .iter()
            .enumerate()
            .map(|(idx, id)| (id, idx))
            .collect();

        let mut entries: Vec<Entry> = listings
            .into_iter()
            .filter_map(|listing| {
                let Some(&priority) = priorities.get(&listing.source_id) else {
                    tracing::warn!(
                        source = %listing.source_id,
                        "dropping listing from unconfigured source"
                    );
                    return None;
                };
                let normalized = normalize_name(&listing.name);
                Some(Entry {
                    listing,
                    normalized,
                    priority,
                })
            })
            .collect();

        entries.sort_by(compare_entries);
        entries
    }

    /// Picks the representative: a listing with an image beats one without;
    /// between equals, near-identical wording resolves to the shorter name.
    fn representative<'a>(&self, members: &[&'a Entry]) -> &'a Entry {
        let mut best = members[0];
        for &candidate in &members[1..] {
            match (candidate.listing.has_image(), best.listing.has_image()) {
                (true, false) => best = candidate,
                (false, true) => {}
                _ => {
                    let near_identical = similarity(&best.normalized, &candidate.normalized)
                        >= self.name_tie_threshold;
                    if near_identical
                        && candidate.normalized.chars().count() < best.normalized.chars().count()
                    {
                        best = candidate;
                    }
                }
            }
        }
        best
    }

    fn build_product(&self, index: usize, members: &[&Entry]) -> MergedProduct {
        let representative = self.representative(members);

        let mut prices: BTreeMap<SourceId, Option<_>> =
            self.sources.iter().map(|id| (id.clone(), None)).collect();
        for member in members {
            if let Some(slot) = prices.get_mut(&member.listing.source_id) {
                if slot.is_none() {
                    *slot = Some(member.listing.price_detail());
                }
            }
        }

        let digest = format!(
            "{:x}",
            Sha256::digest(representative.normalized.as_bytes())
        );

        MergedProduct {
            id: format!("{index}-{}", &digest[..12]),
            canonical_name: representative.listing.name.clone(),
            image_url: representative
                .listing
                .image_url
                .clone()
                .filter(|_| representative.listing.has_image())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
            prices,
        }
    }
}

fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then(a.listing.position.cmp(&b.listing.position))
        .then_with(|| a.normalized.cmp(&b.normalized))
        .then_with(|| a.listing.name.cmp(&b.listing.name))
        .then_with(|| a.listing.raw_price.cmp(&b.listing.raw_price))
        .then_with(|| a.listing.url.cmp(&b.listing.url))
        .then_with(|| a.listing.image_url.cmp(&b.listing.image_url))
        .then_with(|| a.listing.unit.cmp(&b.listing.unit))
}
