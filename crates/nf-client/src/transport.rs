//! HTTP transport layer for newsfilter API requests

use nf_core::{Config, Error, Result};
use rand::Rng;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

/// Retry policy applied uniformly to every outbound call.
///
/// A request is attempted once and then retried up to `max_retries`
/// times with exponential backoff; `jitter` spreads delays by up to
/// 25% to avoid synchronized retries from cron-started runs.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay, jitter: true }
    }

    /// Delay before retry `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)));
        if !self.jitter {
            return exp;
        }
        let millis = exp.as_millis() as u64;
        let spread = millis / 4;
        if spread == 0 {
            return exp;
        }
        let jitter = rand::rng().random_range(0..=spread);
        Duration::from_millis(millis + jitter)
    }
}

/// HTTP transport layer for making requests to the newsfilter API
pub struct Transport {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl Transport {
    /// Create a new transport instance
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("nf-client/0.1.0")
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
        })
    }

    /// Make a GET request to the newsfilter API
    ///
    /// # Arguments
    ///
    /// * `path` - API path relative to the base URL
    /// * `params` - Query parameters for the request
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the deserialized response or an error.
    /// Transient failures (connect/timeout, 5xx, 429) are retried per the
    /// retry policy; other client errors fail fast.
    pub async fn get<T>(&self, path: &str, params: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.build_url(path, params)?;
        debug!("Making request to: {}", url);

        let mut attempt = 0;
        let mut last_error: Option<Error>;

        loop {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                warn!("Retrying request in {}ms (attempt {})", delay.as_millis(), attempt + 1);
                tokio::time::sleep(delay).await;
            }

            match self.make_request(&url).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let text = response.text().await.map_err(|e| {
                            Error::Http(format!("Failed to read response body: {}", e))
                        })?;
                        debug!("Response body length: {} bytes", text.len());

                        return serde_json::from_str::<T>(&text).map_err(|e| {
                            error!("Failed to parse JSON response: {}", e);
                            // char-wise truncation; byte slicing can split
                            // a multibyte character and panic
                            let snippet: String = text.chars().take(200).collect();
                            Error::Parse(format!(
                                "Failed to parse response: {}. Response: {}",
                                e, snippet
                            ))
                        });
                    }

                    if let Some(fatal) = classify_status(status) {
                        error!("Request rejected with status: {}", status);
                        return Err(fatal);
                    }

                    warn!("Transient HTTP failure: {}", status);
                    last_error = Some(Error::Http(format!("HTTP error: {}", status)));
                }
                Err(e) => {
                    warn!("Request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }

            attempt += 1;
            if attempt > self.retry.max_retries {
                return Err(
                    last_error.unwrap_or_else(|| Error::Http("Max retries exceeded".to_string()))
                );
            }
        }
    }

    /// Build the full URL for an API request
    fn build_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| Error::Http(format!("Invalid base URL: {}", e)))?;

        {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in params {
                query_pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Make the actual HTTP request
    async fn make_request(&self, url: &Url) -> Result<Response> {
        self.client
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))
    }

    /// Get the base URL being used
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Map a non-success status to a fatal error, or `None` when the
/// failure is transient and worth retrying.
fn classify_status(status: StatusCode) -> Option<Error> {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return None;
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Some(Error::ApiKey("Invalid API key or unauthorized request".to_string()))
        }
        _ => Some(Error::Api(format!("Request rejected: {}", status))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: &str) -> Config {
        Config {
            api_key: "test_key".to_string(),
            timeout_secs: 5,
            max_retries: 2,
            retry_base_delay_ms: 10,
            base_url: base_url.to_string(),
        }
    }

    #[test]
    fn test_build_url() {
        let transport = Transport::new(&test_config("https://mock.newsfilter.io")).unwrap();
        let url = transport
            .build_url("/articles", &[("limit", "50".to_string()), ("cursor", "abc".to_string())])
            .unwrap();

        assert!(url.as_str().starts_with("https://mock.newsfilter.io/articles"));
        assert!(url.as_str().contains("limit=50"));
        assert!(url.as_str().contains("cursor=abc"));
    }

    #[test]
    fn test_retry_delay_is_exponential_without_jitter() {
        let policy =
            RetryPolicy { max_retries: 3, base_delay: Duration::from_millis(100), jitter: false };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_retry_delay_jitter_is_bounded() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        for _ in 0..50 {
            let d = policy.delay_for(2);
            assert!(d >= Duration::from_millis(200));
            assert!(d <= Duration::from_millis(250));
        }
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::INTERNAL_SERVER_ERROR).is_none());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS).is_none());
        assert!(matches!(classify_status(StatusCode::UNAUTHORIZED), Some(Error::ApiKey(_))));
        assert!(matches!(classify_status(StatusCode::NOT_FOUND), Some(Error::Api(_))));
    }
}
