use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// One transport path the fetch gateway races against every upstream URL.
#[derive(Clone, PartialEq, Eq)]
pub enum TransportSpec {
    /// Plain request from this host.
    Direct,
    /// Request routed through an HTTP, HTTPS or SOCKS proxy.
    Proxy(String),
    /// Request sent to a relay endpoint: the target URL is percent-encoded
    /// and appended to this prefix.
    UrlPrefix(String),
}

impl TransportSpec {
    /// Parses `direct`, `proxy:<url>` or `prefix:<url>`.
    ///
    /// Returns `None` for anything else, including an empty proxy/prefix URL.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("direct") {
            return Some(Self::Direct);
        }
        if let Some(url) = raw.strip_prefix("proxy:") {
            let url = url.trim();
            return (!url.is_empty()).then(|| Self::Proxy(url.to_string()));
        }
        if let Some(url) = raw.strip_prefix("prefix:") {
            let url = url.trim();
            return (!url.is_empty()).then(|| Self::UrlPrefix(url.to_string()));
        }
        None
    }

    /// Short label for logs. Proxy credentials never appear here.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Proxy(_) => "proxy",
            Self::UrlPrefix(_) => "prefix",
        }
    }
}

impl std::fmt::Debug for TransportSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "Direct"),
            Self::Proxy(_) => write!(f, "Proxy([redacted])"),
            Self::UrlPrefix(prefix) => f.debug_tuple("UrlPrefix").field(prefix).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub user_agent: String,
    pub transports: Vec<TransportSpec>,
    pub fetch_timeout_ms: u64,
    pub min_body_bytes: usize,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub search_deadline_secs: u64,
}

impl AppConfig {
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    #[must_use]
    pub fn search_deadline(&self) -> Duration {
        Duration::from_secs(self.search_deadline_secs)
    }

    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}
