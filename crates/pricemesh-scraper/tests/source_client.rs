//! Integration tests for `SourceClient`: fetch + extract under the retry
//! policy, against a local `wiremock` server.

use std::sync::Arc;
use std::time::Duration;

use pricemesh_core::{Coordinates, ExtractorKind, SourceConfig, SourceId, TransportSpec};
use pricemesh_scraper::{FetchGateway, GatewayConfig, RetryPolicy, SourceClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn coords() -> Coordinates {
    Coordinates::new(12.9716, 77.5946).expect("finite coordinates")
}

/// Search page with one JSON-LD `Product` per `(name, price)` pair.
fn listing_page(products: &[(&str, u32)]) -> String {
    let items: Vec<String> = products
        .iter()
        .map(|(name, price)| {
            format!(
                r#"{{"@type":"Product","name":"{name}","offers":{{"price":{price},"priceCurrency":"INR"}}}}"#
            )
        })
        .collect();
    format!(
        r#"<!DOCTYPE html><html><head><script type="application/ld+json">[{}]</script></head><body>{}</body></html>"#,
        items.join(","),
        "results ".repeat(10)
    )
}

fn empty_page() -> String {
    format!(
        "<!DOCTYPE html><html><body><p>No products found</p>{}</body></html>",
        "filler ".repeat(10)
    )
}

fn client(server: &MockServer, max_attempts: u32) -> SourceClient {
    let gateway = FetchGateway::new(GatewayConfig {
        transports: vec![TransportSpec::Direct],
        fetch_timeout: Duration::from_secs(5),
        min_body_bytes: 64,
        ..GatewayConfig::default()
    })
    .expect("gateway");

    SourceClient::from_config(
        SourceConfig {
            id: SourceId::new("freshmart").expect("valid id"),
            name: "FreshMart".into(),
            priority: 1,
            search_url: format!("{}/search?q={{query}}&lat={{lat}}&lng={{lon}}", server.uri()),
            extractor: ExtractorKind::JsonLd,
        },
        Arc::new(gateway),
        RetryPolicy::new(max_attempts, Duration::ZERO),
    )
}

#[tokio::test]
async fn returns_listings_stamped_with_source_and_position() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "amul milk"))
        .and(query_param("lat", "12.971600"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[("Amul Milk 500ml", 30), ("Amul Gold 1L", 68)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let retrieval = client(&server, 3).retrieve_detailed("amul milk", coords()).await;

    assert_eq!(retrieval.attempts, 1);
    assert!(retrieval.error.is_none());
    assert_eq!(retrieval.listings.len(), 2);
    assert_eq!(retrieval.listings[0].name, "Amul Milk 500ml");
    assert_eq!(retrieval.listings[0].raw_price, "₹30");
    assert_eq!(retrieval.listings[0].position, 0);
    assert_eq!(retrieval.listings[1].position, 1);
    assert!(retrieval
        .listings
        .iter()
        .all(|l| l.source_id.as_str() == "freshmart"));
    assert!(retrieval
        .request_url
        .as_deref()
        .is_some_and(|u| u.contains("q=amul%20milk")));
}

#[tokio::test]
async fn empty_extraction_is_retried_against_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty_page()))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[("Tata Salt", 28)])))
        .expect(1)
        .mount(&server)
        .await;

    let retrieval = client(&server, 3).retrieve_detailed("salt", coords()).await;

    assert_eq!(retrieval.attempts, 2);
    assert_eq!(retrieval.listings.len(), 1);
    assert!(retrieval.error.is_none());
}

#[tokio::test]
async fn persistent_fetch_failure_reports_error_after_all_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let retrieval = client(&server, 3).retrieve_detailed("milk", coords()).await;

    assert_eq!(retrieval.attempts, 3);
    assert!(retrieval.listings.is_empty());
    let error = retrieval.error.expect("hard error recorded");
    assert!(error.contains("HTTP 503"), "got: {error}");
}

#[tokio::test]
async fn persistent_empty_extraction_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty_page()))
        .expect(3)
        .mount(&server)
        .await;

    let retrieval = client(&server, 3).retrieve_detailed("caviar", coords()).await;

    assert_eq!(retrieval.attempts, 3);
    assert!(retrieval.listings.is_empty());
    assert!(retrieval.error.is_none());
}

#[tokio::test]
async fn earlier_fetch_error_is_kept_when_later_attempts_come_back_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty_page()))
        .mount(&server)
        .await;

    let retrieval = client(&server, 3).retrieve_detailed("milk", coords()).await;

    assert_eq!(retrieval.attempts, 3);
    let error = retrieval.error.expect("fetch error observed");
    assert!(error.contains("HTTP 502"), "got: {error}");
}

#[tokio::test]
async fn retrieve_swallows_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let listings = client(&server, 2).retrieve("milk", coords()).await;
    assert!(listings.is_empty());
}

#[tokio::test]
async fn invalid_template_is_not_retried() {
    let gateway = Arc::new(FetchGateway::new(GatewayConfig::default()).expect("gateway"));
    let client = SourceClient::from_config(
        SourceConfig {
            id: SourceId::new("broken").expect("valid id"),
            name: "Broken".into(),
            priority: 1,
            search_url: "https://exa mple.test/search?q={query}".into(),
            extractor: ExtractorKind::NextData,
        },
        gateway,
        RetryPolicy::new(3, Duration::ZERO),
    );

    let retrieval = client.retrieve_detailed("milk", coords()).await;
    assert_eq!(retrieval.attempts, 0);
    assert!(retrieval.request_url.is_none());
    assert!(retrieval
        .error
        .is_some_and(|e| e.contains("invalid search URL")));
}
