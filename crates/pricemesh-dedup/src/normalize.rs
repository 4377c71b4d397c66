//! Product-name normalization applied before similarity scoring.

use std::sync::LazyLock;

use regex::Regex;

/// Pack-size and quantity tokens: `1kg`, `500 ml`, `4x100g`, `1.5l`, `6 pcs`.
static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d+(?:\.\d+)?\s*(?:x\s*\d+(?:\.\d+)?\s*)?(?:kgs?|g|gms?|grams?|mg|l|ltrs?|litres?|liters?|ml|cl|oz|lbs?|pcs?|pieces?|packs?|units?)\b",
    )
    .expect("valid regex")
});

/// Normalizes a listing name for comparison.
///
/// Steps, in order: lowercase; strip quantity/unit tokens; replace
/// punctuation with spaces; collapse runs of whitespace and trim.
///
/// A name made only of quantity tokens normalizes to the empty string.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let without_quantities = QUANTITY_RE.replace_all(&lower, " ");
    let without_punctuation: String = without_quantities
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    without_punctuation
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
