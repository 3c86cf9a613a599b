//! Paced, retried outbound GET requests.
//!
//! Every attempt waits for the configured pacing delay first so provider rate
//! limits are respected whether the previous attempt succeeded or not.

use crate::client::providers::ProviderError;
use crate::config::{FetchConfig, HttpConfig};
use crate::resilience::{retry_with_config, RetryConfig};
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

/// Per-adapter HTTP client with pacing and bounded retry
#[derive(Debug)]
pub struct ResilientFetcher {
    platform: String,
    headers: HeaderMap,
    http: HttpConfig,
    pacing: Duration,
    retry: RetryConfig,
    client: RwLock<Option<Client>>,
}

impl ResilientFetcher {
    /// Create a fetcher whose client sends `headers` on every request
    pub fn new(
        platform: &str,
        headers: HeaderMap,
        http: &HttpConfig,
        fetch: &FetchConfig,
    ) -> Result<Self, ProviderError> {
        let client = build_client(&headers, http)?;

        Ok(Self {
            platform: platform.to_string(),
            headers,
            http: http.clone(),
            pacing: fetch.request_delay(),
            retry: RetryConfig::from(fetch),
            client: RwLock::new(Some(client)),
        })
    }

    #[must_use]
    pub const fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Fetch `url` and return the response body
    pub async fn fetch(&self, url: &Url) -> Result<String, ProviderError> {
        let operation = format!("{} GET {}", self.platform, url.path());
        retry_with_config(|| self.attempt(url), &self.retry, &operation).await
    }

    /// Fetch `url` and parse the body as JSON
    pub async fn fetch_json(&self, url: &Url) -> Result<serde_json::Value, ProviderError> {
        let body = self.fetch(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::Parse(format!("Invalid JSON from {}: {e}", self.platform)))
    }

    /// Drop the connection pool; a later fetch builds a fresh one
    pub async fn release(&self) -> Result<(), ProviderError> {
        if self.client.write().await.take().is_some() {
            info!("Released HTTP client for {}", self.platform);
        }
        Ok(())
    }

    pub async fn is_released(&self) -> bool {
        self.client.read().await.is_none()
    }

    async fn attempt(&self, url: &Url) -> Result<String, ProviderError> {
        if !self.pacing.is_zero() {
            sleep(self.pacing).await;
        }

        let client = self.client().await?;
        debug!("Fetching: {}", url);

        let response = client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        Ok(response.text().await?)
    }

    async fn client(&self) -> Result<Client, ProviderError> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut guard = self.client.write().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let client = build_client(&self.headers, &self.http)?;
        *guard = Some(client.clone());
        Ok(client)
    }
}

fn build_client(headers: &HeaderMap, http: &HttpConfig) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(http.timeout())
        .connect_timeout(http.connect_timeout())
        .user_agent(http.user_agent.as_str())
        .default_headers(headers.clone())
        .build()
        .map_err(|e| ProviderError::Other(format!("Failed to create HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_fetch_config() -> FetchConfig {
        FetchConfig {
            request_delay_ms: 0,
            max_attempts: 3,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    fn fetcher(headers: HeaderMap) -> ResilientFetcher {
        ResilientFetcher::new("test", headers, &HttpConfig::default(), &fast_fetch_config())
            .unwrap()
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/flaky", server.uri())).unwrap();
        let body = fetcher(HeaderMap::new()).fetch(&url).await.unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_last_error_propagates_after_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher(HeaderMap::new()).fetch(&url).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimit));
    }

    #[tokio::test]
    async fn test_default_headers_and_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-api-key", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"a": 1})))
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "k".parse().unwrap());
        let url = Url::parse(&server.uri()).unwrap();

        let value = fetcher(headers).fetch_json(&url).await.unwrap();
        assert_eq!(value["a"], 1);
    }

    #[tokio::test]
    async fn test_release_then_lazy_rebuild() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("again"))
            .mount(&server)
            .await;

        let fetcher = fetcher(HeaderMap::new());
        fetcher.release().await.unwrap();
        assert!(fetcher.is_released().await);

        let url = Url::parse(&server.uri()).unwrap();
        assert_eq!(fetcher.fetch(&url).await.unwrap(), "again");
        assert!(!fetcher.is_released().await);
    }

    #[tokio::test]
    async fn test_pacing_precedes_every_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let config = FetchConfig {
            request_delay_ms: 50,
            ..fast_fetch_config()
        };
        let fetcher =
            ResilientFetcher::new("test", HeaderMap::new(), &HttpConfig::default(), &config)
                .unwrap();
        assert_eq!(fetcher.pacing(), Duration::from_millis(50));

        let url = Url::parse(&server.uri()).unwrap();
        let start = std::time::Instant::now();
        assert!(fetcher.fetch(&url).await.is_err());
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
