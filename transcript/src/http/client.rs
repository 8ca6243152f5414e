//! HTTP client builder with middleware.

use std::time::Duration;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::BackoffPolicy;
use crate::Error;

/// HTTP client configuration.
#[derive(Debug, Clone)]
struct HttpClientConfig {
    /// Per-request timeout, covering connect through body download.
    timeout: Duration,
    /// Retry policy for transient failures. `BackoffPolicy::none()` disables retries.
    retry: BackoffPolicy,
    user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: BackoffPolicy::none(),
            user_agent: format!("learnloop-transcript/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client with middleware.
pub type HttpClient = reqwest_middleware::ClientWithMiddleware;

/// Builder for HTTP clients used by the transcript sources.
///
/// Every client it builds has a hard request timeout so that no upstream can stall
/// a resolution indefinitely.
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the retry policy for transient failures.
    pub fn with_retry_policy(mut self, retry: BackoffPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Build the configured HTTP client.
    pub fn build(self) -> Result<HttpClient, Error> {
        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent)
            .build()?;

        let mut builder = ClientBuilder::new(client);
        if self.config.retry.max_retries() > 0 {
            builder = builder.with(RetryTransientMiddleware::new_with_policy(
                self.config.retry,
            ));
        }

        Ok(builder.build())
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
