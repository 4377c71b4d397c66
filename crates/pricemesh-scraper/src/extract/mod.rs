//! Turns a source's search-result page into listings.
//!
//! Extraction is a capability, not a class hierarchy: each source is bound
//! to one [`Extractor`] by its registry entry, and a custom implementation
//! can be handed to [`crate::SourceClient::new`] directly.

mod jsonld;
mod next_data;

use std::sync::Arc;

use pricemesh_core::{ExtractedListing, ExtractorKind};
use serde_json::Value;

pub use jsonld::JsonLdExtractor;
pub use next_data::NextDataExtractor;

/// Pure, source-specific page parser.
///
/// Implementations must not fabricate listings. A record that is a
/// placeholder rather than real upstream data is returned with
/// `is_synthetic = true` so the orchestrator can drop it.
pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str, query: &str) -> Vec<ExtractedListing>;
}

/// Built-in extractor for a registry `extractor` value.
#[must_use]
pub fn extractor_for(kind: ExtractorKind) -> Arc<dyn Extractor> {
    match kind {
        ExtractorKind::JsonLd => Arc::new(JsonLdExtractor),
        ExtractorKind::NextData => Arc::new(NextDataExtractor),
    }
}

/// Non-empty trimmed string value.
fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numbers as written, strings trimmed; anything else is absent.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// First usable image reference: a string, the first string of an array, or
/// an object's `url`.
fn image_ref(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(_) => non_empty_str(value),
        Value::Array(items) => items.iter().find_map(|item| image_ref(Some(item))),
        Value::Object(map) => non_empty_str(map.get("url")),
        _ => None,
    }
}

/// `true` when the record explicitly marks itself as placeholder data.
fn flagged_synthetic(record: &Value) -> bool {
    ["placeholder", "is_placeholder", "synthetic"]
        .iter()
        .any(|key| record.get(key).and_then(Value::as_bool) == Some(true))
}

/// Prefixes a bare amount with the symbol for an ISO currency code. Amounts
/// that already carry a symbol are left alone.
fn with_currency(amount: &str, currency: Option<&str>) -> String {
    if !amount.starts_with(|c: char| c.is_ascii_digit()) {
        return amount.to_string();
    }
    match currency.map(str::trim) {
        Some(code) if code.eq_ignore_ascii_case("INR") => format!("₹{amount}"),
        Some(code) if code.eq_ignore_ascii_case("USD") => format!("${amount}"),
        Some(code) if code.eq_ignore_ascii_case("EUR") => format!("€{amount}"),
        Some(code) if code.eq_ignore_ascii_case("GBP") => format!("£{amount}"),
        Some(code) if !code.is_empty() => format!("{} {amount}", code.to_ascii_uppercase()),
        _ => amount.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extractor_for_each_kind_handles_empty_page() {
        for kind in [ExtractorKind::JsonLd, ExtractorKind::NextData] {
            assert!(extractor_for(kind).extract("<html></html>", "milk").is_empty());
        }
    }

    #[test]
    fn image_ref_accepts_common_shapes() {
        assert_eq!(image_ref(Some(&json!("https://i/a.jpg"))).as_deref(), Some("https://i/a.jpg"));
        assert_eq!(
            image_ref(Some(&json!(["", "https://i/b.jpg"]))).as_deref(),
            Some("https://i/b.jpg")
        );
        assert_eq!(
            image_ref(Some(&json!({"@type": "ImageObject", "url": "https://i/c.jpg"}))).as_deref(),
            Some("https://i/c.jpg")
        );
        assert_eq!(image_ref(Some(&json!(42))), None);
    }

    #[test]
    fn currency_symbols() {
        assert_eq!(with_currency("32", Some("INR")), "₹32");
        assert_eq!(with_currency("4.99", Some("usd")), "$4.99");
        assert_eq!(with_currency("10", Some("JPY")), "JPY 10");
        assert_eq!(with_currency("₹32", Some("INR")), "₹32");
        assert_eq!(with_currency("32", None), "32");
    }

    #[test]
    fn synthetic_flag_requires_literal_true() {
        assert!(flagged_synthetic(&json!({"placeholder": true})));
        assert!(flagged_synthetic(&json!({"is_placeholder": true})));
        assert!(!flagged_synthetic(&json!({"synthetic": "yes"})));
        assert!(!flagged_synthetic(&json!({"name": "Milk"})));
    }
}
