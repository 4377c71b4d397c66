//! Product-shaped records inside a Next.js `__NEXT_DATA__` payload.

use std::sync::LazyLock;

use pricemesh_core::ExtractedListing;
use regex::Regex;
use serde_json::{Map, Value};

use super::{flagged_synthetic, image_ref, non_empty_str, scalar_text, with_currency, Extractor};

static NEXT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+id\s*=\s*["']__NEXT_DATA__["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

const NAME_KEYS: [&str; 4] = ["name", "title", "product_name", "display_name"];
const PRICE_KEYS: [&str; 5] = ["price", "mrp", "offer_price", "selling_price", "sp"];
const UNIT_KEYS: [&str; 3] = ["unit", "quantity", "weight"];

/// Walks the page's hydration payload for any object carrying both a name
/// key and a price key. Matched objects are not descended into, so variant
/// arrays nested inside a product do not double count.
#[derive(Debug, Clone, Copy, Default)]
pub struct NextDataExtractor;

impl Extractor for NextDataExtractor {
    fn extract(&self, html: &str, _query: &str) -> Vec<ExtractedListing> {
        let Some(payload) = NEXT_DATA_RE.captures(html).and_then(|cap| cap.get(1)) else {
            return Vec::new();
        };
        let value: Value = match serde_json::from_str(payload.as_str().trim()) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "malformed __NEXT_DATA__ payload");
                return Vec::new();
            }
        };

        let mut listings = Vec::new();
        walk(&value, &mut listings);
        listings
    }
}

fn walk(value: &Value, out: &mut Vec<ExtractedListing>) {
    match value {
        Value::Array(items) => {
            for item in items {
                walk(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(listing) = record_to_listing(value, map) {
                out.push(listing);
                return;
            }
            for child in map.values() {
                walk(child, out);
            }
        }
        _ => {}
    }
}

fn record_to_listing(record: &Value, map: &Map<String, Value>) -> Option<ExtractedListing> {
    let name = NAME_KEYS.iter().find_map(|key| non_empty_str(map.get(*key)))?;
    let amount = PRICE_KEYS.iter().find_map(|key| scalar_text(map.get(*key)))?;
    let currency = map.get("currency").and_then(Value::as_str);

    Some(ExtractedListing {
        name,
        raw_price: with_currency(&amount, currency),
        unit: UNIT_KEYS.iter().find_map(|key| scalar_text(map.get(*key))),
        url: non_empty_str(map.get("url")).or_else(|| non_empty_str(map.get("slug"))),
        image_url: image_ref(map.get("image")).or_else(|| image_ref(map.get("image_url"))),
        is_synthetic: flagged_synthetic(record),
    })
}
