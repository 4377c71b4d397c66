use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use pricemesh_core::TransportSpec;

use super::validate::check_page;
use crate::error::ScraperError;

/// One way of reaching an upstream URL. Cheap to clone: the inner
/// `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    label: &'static str,
    client: reqwest::Client,
    /// Relay prefix; the target URL is percent-encoded and appended.
    prefix: Option<String>,
}

impl Transport {
    /// Builds the HTTP client for `kind`. Called once per transport at
    /// gateway construction.
    ///
    /// No overall request timeout is set: the race deadline bounds each
    /// fetch and aborting the task drops the request.
    pub(crate) fn build(
        kind: &TransportSpec,
        user_agent: &str,
        fetch_timeout: Duration,
    ) -> Result<Self, ScraperError> {
        let builder = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(fetch_timeout.min(Duration::from_secs(10)));

        let (builder, prefix) = match kind {
            TransportSpec::Direct => (builder.no_proxy(), None),
            TransportSpec::Proxy(url) => {
                let proxy = reqwest::Proxy::all(url.as_str()).map_err(|e| {
                    ScraperError::Transport {
                        transport: kind.label(),
                        reason: e.to_string(),
                    }
                })?;
                (builder.proxy(proxy), None)
            }
            TransportSpec::UrlPrefix(prefix) => (builder.no_proxy(), Some(prefix.clone())),
        };

        let client = builder.build().map_err(|e| ScraperError::Transport {
            transport: kind.label(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            label: kind.label(),
            client,
            prefix,
        })
    }

    pub(crate) fn label(&self) -> &'static str {
        self.label
    }

    /// URL actually requested for `target` over this transport.
    pub(crate) fn request_url(&self, target: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{}", utf8_percent_encode(target, NON_ALPHANUMERIC)),
            None => target.to_string(),
        }
    }

    /// Fetches `target` and returns the body only if it passes the validity
    /// check. The error string is a one-line reason for the race summary.
    pub(crate) async fn fetch(&self, target: &str, min_body_bytes: usize) -> Result<String, String> {
        let response = self
            .client
            .get(self.request_url(target))
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;

        check_page(status, &body, min_body_bytes).map_err(|rejection| rejection.to_string())?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "pricemesh-test";

    #[test]
    fn direct_requests_target_unchanged() {
        let transport =
            Transport::build(&TransportSpec::Direct, UA, Duration::from_secs(1)).unwrap();
        assert_eq!(transport.label(), "direct");
        assert_eq!(
            transport.request_url("https://a.example/s?q=milk"),
            "https://a.example/s?q=milk"
        );
    }

    #[test]
    fn prefix_encodes_target() {
        let kind = TransportSpec::UrlPrefix("https://relay.example/raw?url=".into());
        let transport = Transport::build(&kind, UA, Duration::from_secs(1)).unwrap();
        assert_eq!(transport.label(), "prefix");
        assert_eq!(
            transport.request_url("https://a.example/s?q=milk&x=1"),
            "https://relay.example/raw?url=https%3A%2F%2Fa%2Eexample%2Fs%3Fq%3Dmilk%26x%3D1"
        );
    }

    #[test]
    fn proxy_with_valid_url_builds() {
        let kind = TransportSpec::Proxy("http://127.0.0.1:8888".into());
        let transport = Transport::build(&kind, UA, Duration::from_secs(1)).unwrap();
        assert_eq!(transport.label(), "proxy");
    }

    #[test]
    fn proxy_with_invalid_port_is_rejected() {
        let kind = TransportSpec::Proxy("http://127.0.0.1:99999".into());
        let err = Transport::build(&kind, UA, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(
            err,
            ScraperError::Transport {
                transport: "proxy",
                ..
            }
        ));
    }
}
