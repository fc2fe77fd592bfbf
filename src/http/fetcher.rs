//! Upstream fetch wrapper.
//!
//! `Fetcher` is the seam between strategies and the network: production code
//! uses the reqwest-backed `HttpFetcher`, tests inject scripted fetchers.
//! Transport failures are normalized to `GatewayError::Network`; HTTP error
//! statuses are returned as ordinary responses so strategies can decide what
//! to cache.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GatewayError, Result};
use crate::http::{FetchRequest, StoredResponse};

// == Fetcher Trait ==
/// Issues a request against the upstream origin.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs the request, returning the response or a normalized
    /// transport error. Any HTTP status is a successful fetch.
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse>;
}

// == HTTP Fetcher ==
/// reqwest-backed fetcher targeting a fixed upstream base URL.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    /// Creates a fetcher for the given upstream with a request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| GatewayError::Internal(format!("Invalid method: {}", request.method)))?;

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("{url}: {e}")))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Network(format!("{url}: {e}")))?
            .to_vec();

        Ok(StoredResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let fetcher = HttpFetcher::new("http://origin:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(fetcher.base_url, "http://origin:8080");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_network_error() {
        // Reserved TEST-NET-1 address, nothing listens there
        let fetcher =
            HttpFetcher::new("http://192.0.2.1:9", Duration::from_millis(200)).unwrap();
        let result = fetcher.fetch(&FetchRequest::get("/")).await;
        assert!(matches!(result, Err(GatewayError::Network(_))));
    }
}
