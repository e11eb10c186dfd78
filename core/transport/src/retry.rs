//! Exponential backoff for rate-limited calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use deskbridge_common::{Error, Result};

use crate::request::ApiRequest;
use crate::transport::Transport;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts. Zero leaves backoff to the caller.
    pub max_retries: u32,
    /// Initial delay between retries, in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay (cap for exponential growth), in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl RetryConfig {
    /// Create a new retry configuration.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Set initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);

        let capped_delay = base_delay.min(self.max_delay_ms as f64);

        let final_delay = if self.jitter {
            // +/- 25%
            let jitter_factor = 0.75 + (rand::random::<f64>() * 0.5);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Transport wrapper that retries `RateLimited` failures.
///
/// Every other error, and the final rate-limit error once retries are
/// exhausted, is returned unchanged.
pub struct RetryingTransport<T> {
    inner: T,
    config: RetryConfig,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Get the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Get the wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let mut attempt = 0;

        loop {
            match self.inner.send(request.clone()).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{} succeeded after {} retries", request, attempt);
                    }
                    return Ok(value);
                }
                Err(Error::RateLimited { retry_after }) if attempt < self.config.max_retries => {
                    let backoff = self.config.delay_for_attempt(attempt);
                    let delay = retry_after.map_or(backoff, |server| server.max(backoff));
                    attempt += 1;
                    warn!(
                        "{} rate limited (attempt {}). Retrying in {:?}...",
                        request, attempt, delay
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use crate::request::Method;
    use serde_json::json;

    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig::new(max_retries)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[test]
    fn test_retry_config_delay_calculation() {
        let config = RetryConfig::new(3)
            .with_initial_delay(Duration::from_secs(1))
            .with_backoff_multiplier(2.0)
            .with_jitter(false);

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn test_max_delay_cap() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(10))
            .with_backoff_multiplier(10.0)
            .with_jitter(false);

        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_retries_rate_limited_then_succeeds() {
        let memory = MemoryTransport::new();
        memory.push_error(
            Method::Get,
            "/api/ticket",
            Error::RateLimited { retry_after: None },
        );
        memory.push_response(Method::Get, "/api/ticket", json!({"TicketID": 1}));

        let transport = RetryingTransport::new(memory, fast(2));
        let value = transport.send(ApiRequest::get("/api/ticket")).await.unwrap();

        assert_eq!(value, json!({"TicketID": 1}));
        assert_eq!(transport.inner().requests().len(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let memory = MemoryTransport::new();
        for _ in 0..3 {
            memory.push_error(
                Method::Get,
                "/api/ticket",
                Error::RateLimited { retry_after: None },
            );
        }

        let transport = RetryingTransport::new(memory, fast(2));
        let err = transport
            .send(ApiRequest::get("/api/ticket"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RateLimited { .. }));
        // Initial + 2 retries = 3 attempts
        assert_eq!(transport.inner().requests().len(), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let memory = MemoryTransport::new();
        memory.push_error(
            Method::Post,
            "/api/comment",
            Error::ServerReported {
                code: "400".to_string(),
                description: "Bad ticket".to_string(),
            },
        );

        let transport = RetryingTransport::new(memory, fast(5));
        let err = transport
            .send(ApiRequest::post("/api/comment"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ServerReported { .. }));
        assert_eq!(transport.inner().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_surfaces_rate_limit() {
        let memory = MemoryTransport::new();
        memory.push_error(
            Method::Get,
            "/api/categories",
            Error::RateLimited {
                retry_after: Some(Duration::from_secs(30)),
            },
        );

        let transport = RetryingTransport::new(memory, RetryConfig::default());
        let err = transport
            .send(ApiRequest::get("/api/categories"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(30)
        ));
    }
}
