/// Similarity of two (already normalized) names in `[0, 1]`.
///
/// Normalized Levenshtein distance: `1 - edits / max(len_a, len_b)`, counted
/// in chars. Two empty strings are identical (`1.0`); an empty string against
/// anything non-empty scores `0.0`.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}
