//! Cross-source product deduplication.
//!
//! Listings from independent sources share no key, so identity is resolved
//! by fuzzy name matching: names are normalized (case, pack sizes and
//! punctuation removed), compared by normalized edit distance, and greedily
//! clustered into [`pricemesh_core::MergedProduct`] records.

pub mod merge;
pub mod normalize;
pub mod similarity;

pub use merge::{Deduplicator, DEFAULT_CLUSTER_THRESHOLD, DEFAULT_NAME_TIE_THRESHOLD};
pub use normalize::normalize_name;
pub use similarity::similarity;
