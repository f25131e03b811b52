//! Shared reqwest client for HTTP-backed adapters.
//!
//! Grounded on the upstream gateway's `http_client` module: one pooled
//! client per process, keep-alive on, short idle timeout so DNS changes
//! are picked up without paying a new-connection cost on every request.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};

fn default_http_client_builder() -> reqwest::ClientBuilder {
    let mut headers = HeaderMap::new();
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .default_headers(headers)
}

/// Process-wide HTTP client, reused across every HTTP adapter so
/// connection pools are shared.
pub fn http_client() -> reqwest::Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();

    CLIENT
        .get_or_init(|| {
            default_http_client_builder()
                .build()
                .expect("failed to build default HTTP client")
        })
        .clone()
}
