//! Async HTTP client wrapping reqwest.
//!
//! One client is built per [`crate::Scout`] and shared by every fetch; the
//! underlying connection pool is safe for concurrent use. Retries live in
//! [`crate::fetcher`], not here: each call is exactly one request.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::time::Duration;

use crate::config::FetchPolicy;
use crate::types::ScoutResult;

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

/// Shared HTTP client for the scraping pipeline.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Build a client with the browser-like headers the catalog expects.
    pub fn new(policy: &FetchPolicy) -> ScoutResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );

        let client = reqwest::Client::builder()
            .user_agent(policy.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .danger_accept_invalid_certs(policy.accept_invalid_certs)
            .timeout(policy.request_timeout())
            .build()?;

        Ok(Self {
            client,
            timeout: policy.request_timeout(),
        })
    }

    /// Perform a single GET request.
    ///
    /// Any status is returned as a response; only transport failures and
    /// unreadable bodies are errors.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let r = self.client.get(url).timeout(self.timeout).send().await?;
        let status = r.status().as_u16();
        let final_url = r.url().to_string();
        let body = r.text().await?;

        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new(&FetchPolicy::default());
        assert!(client.is_ok());
    }
}
