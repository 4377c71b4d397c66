//! schema.org `Product` extraction from `application/ld+json` blocks.

use std::sync::LazyLock;

use pricemesh_core::ExtractedListing;
use regex::Regex;
use serde_json::Value;

use super::{flagged_synthetic, image_ref, non_empty_str, scalar_text, with_currency, Extractor};

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

/// Reads every JSON-LD block on the page. Arrays, `@graph` containers and
/// `ItemList.itemListElement` entries are expanded; only `Product` objects
/// with a name and a price become listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLdExtractor;

impl Extractor for JsonLdExtractor {
    fn extract(&self, html: &str, _query: &str) -> Vec<ExtractedListing> {
        let mut listings = Vec::new();

        for cap in SCRIPT_RE.captures_iter(html) {
            let Some(json_text) = cap.get(1) else {
                continue;
            };
            let value: Value = match serde_json::from_str(json_text.as_str().trim()) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed JSON-LD block");
                    continue;
                }
            };
            let mut found = Vec::new();
            collect_products(&value, &mut found);
            listings.extend(found.into_iter().filter_map(product_to_listing));
        }

        listings
    }
}

/// Depth-first walk over the containers JSON-LD uses to group products.
fn collect_products<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_products(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(graph) = map.get("@graph") {
                collect_products(graph, out);
            }
            if has_type(value, "ItemList") {
                if let Some(Value::Array(elements)) = map.get("itemListElement") {
                    for element in elements {
                        // ListItem wraps the product in `item`; some sites inline it.
                        collect_products(element.get("item").unwrap_or(element), out);
                    }
                }
            }
            if has_type(value, "Product") {
                out.push(value);
            }
        }
        _ => {}
    }
}

/// `@type` may be a plain string or an array of strings.
fn has_type(item: &Value, wanted: &str) -> bool {
    match item.get("@type") {
        Some(Value::String(s)) => s.eq_ignore_ascii_case(wanted),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|s| s.eq_ignore_ascii_case(wanted)),
        _ => false,
    }
}

fn product_to_listing(product: &Value) -> Option<ExtractedListing> {
    let name = non_empty_str(product.get("name"))?;
    let raw_price = offer_price(product.get("offers")?)?;

    Some(ExtractedListing {
        name,
        raw_price,
        unit: unit_label(product.get("size")).or_else(|| unit_label(product.get("weight"))),
        url: non_empty_str(product.get("url")),
        image_url: image_ref(product.get("image")),
        is_synthetic: flagged_synthetic(product),
    })
}

/// Price of the first offer that has one: `price`, then `lowPrice`
/// (AggregateOffer).
fn offer_price(offers: &Value) -> Option<String> {
    match offers {
        Value::Array(items) => items.iter().find_map(offer_price),
        Value::Object(_) => {
            let amount =
                scalar_text(offers.get("price")).or_else(|| scalar_text(offers.get("lowPrice")))?;
            let currency = offers.get("priceCurrency").and_then(Value::as_str);
            Some(with_currency(&amount, currency))
        }
        _ => None,
    }
}

/// `"500 ml"`, or a QuantitativeValue `{value, unitText}`.
fn unit_label(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Object(map) => {
            let amount = scalar_text(map.get("value"))?;
            match non_empty_str(map.get("unitText")).or_else(|| non_empty_str(map.get("unitCode"))) {
                Some(unit) => Some(format!("{amount} {unit}")),
                None => Some(amount),
            }
        }
        other => scalar_text(Some(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(blocks: &[&str]) -> String {
        let scripts: String = blocks
            .iter()
            .map(|b| format!(r#"<script type="application/ld+json">{b}</script>"#))
            .collect();
        format!("<!doctype html><html><head>{scripts}</head><body></body></html>")
    }

    #[test]
    fn extracts_single_product() {
        let html = page(&[r#"{
            "@context": "https://schema.org",
            "@type": "Product",
            "name": "Amul Taaza Milk",
            "image": "https://cdn.example/amul.jpg",
            "url": "https://shop.example/p/amul-taaza",
            "size": "500 ml",
            "offers": {"@type": "Offer", "price": 27, "priceCurrency": "INR"}
        }"#]);

        let listings = JsonLdExtractor.extract(&html, "milk");
        assert_eq!(listings.len(), 1);
        let listing = &listings[0];
        assert_eq!(listing.name, "Amul Taaza Milk");
        assert_eq!(listing.raw_price, "₹27");
        assert_eq!(listing.unit.as_deref(), Some("500 ml"));
        assert_eq!(listing.url.as_deref(), Some("https://shop.example/p/amul-taaza"));
        assert_eq!(listing.image_url.as_deref(), Some("https://cdn.example/amul.jpg"));
        assert!(!listing.is_synthetic);
    }

    #[test]
    fn expands_item_list_and_graph() {
        let html = page(&[
            r#"{"@type": "ItemList", "itemListElement": [
                {"@type": "ListItem", "position": 1,
                 "item": {"@type": "Product", "name": "Amul Milk", "offers": {"price": "30"}}},
                {"@type": "Product", "name": "Mother Dairy Milk", "offers": {"price": "28"}}
            ]}"#,
            r#"{"@graph": [
                {"@type": "WebPage", "name": "Search"},
                {"@type": ["Product", "IndividualProduct"], "name": "Nestle Milk",
                 "offers": [{"@type": "AggregateOffer", "lowPrice": 65, "priceCurrency": "INR"}]}
            ]}"#,
        ]);

        let names: Vec<String> = JsonLdExtractor
            .extract(&html, "milk")
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["Amul Milk", "Mother Dairy Milk", "Nestle Milk"]);
    }

    #[test]
    fn each_block_contributes_listings_in_page_order() {
        let html = page(&[
            r#"{"@type": "Product", "name": "Amul Butter", "offers": {"price": 56, "priceCurrency": "INR"}}"#,
            r#"[{"@type": "Product", "name": "Britannia Bread", "offers": {"price": 40, "priceCurrency": "INR"}},
                {"@type": "Product", "name": "Parle G", "offers": {"price": 10, "priceCurrency": "INR"}}]"#,
        ]);

        let listings = JsonLdExtractor.extract(&html, "breakfast");
        let summary: Vec<(&str, &str)> = listings
            .iter()
            .map(|l| (l.name.as_str(), l.raw_price.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![("Amul Butter", "₹56"), ("Britannia Bread", "₹40"), ("Parle G", "₹10")]
        );
    }

    #[test]
    fn product_without_price_is_skipped() {
        let html = page(&[r#"{"@type": "Product", "name": "Amul Milk"}"#]);
        assert!(JsonLdExtractor.extract(&html, "milk").is_empty());
    }

    #[test]
    fn non_product_types_are_ignored() {
        let html = page(&[r#"{"@type": "Organization", "name": "Shop", "offers": {"price": 1}}"#]);
        assert!(JsonLdExtractor.extract(&html, "milk").is_empty());
    }

    #[test]
    fn malformed_block_does_not_hide_valid_ones() {
        let html = page(&[
            "{not json",
            r#"{"@type": "Product", "name": "Tata Salt", "offers": {"price": 28}}"#,
        ]);
        let listings = JsonLdExtractor.extract(&html, "salt");
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].raw_price, "28");
    }

    #[test]
    fn quantitative_weight_becomes_unit() {
        let html = page(&[r#"{"@type": "Product", "name": "Tata Salt",
            "weight": {"@type": "QuantitativeValue", "value": 1, "unitText": "kg"},
            "offers": {"price": 28}}"#]);
        let listings = JsonLdExtractor.extract(&html, "salt");
        assert_eq!(listings[0].unit.as_deref(), Some("1 kg"));
    }

    #[test]
    fn placeholder_flag_marks_listing_synthetic() {
        let html = page(&[r#"{"@type": "Product", "name": "Sample Milk",
            "placeholder": true, "offers": {"price": 1}}"#]);
        let listings = JsonLdExtractor.extract(&html, "milk");
        assert_eq!(listings.len(), 1);
        assert!(listings[0].is_synthetic);
    }
}
