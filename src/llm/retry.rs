//! Retry with exponential backoff around any [`LlmClient`].
//!
//! Only transient provider failures are retried. Every attempt shares the
//! caller's future, so dropping it cancels the pending attempt and the backoff.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use super::client::{LlmClient, ModelRequest};
use crate::config::RetryConfig;
use crate::error::ProviderError;

/// Delay before retry number `attempt` (0-based): `initial * multiplier^attempt`, capped.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let factor = config.backoff_multiplier.max(1.0).powi(attempt as i32);
    let millis = (config.initial_delay_ms as f64 * factor).min(config.max_delay_ms as f64);
    Duration::from_millis(millis as u64)
}

pub struct RetryingClient<C> {
    inner: C,
    config: RetryConfig,
}

impl<C: LlmClient> RetryingClient<C> {
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for RetryingClient<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn send(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        let attempts = self.config.max_retries + 1;
        let mut attempt = 0;
        loop {
            match self.inner.send(request).await {
                Ok(text) => {
                    if attempt > 0 {
                        info!(
                            "{} call succeeded on attempt {}/{}",
                            self.inner.name(),
                            attempt + 1,
                            attempts
                        );
                    }
                    return Ok(text);
                }
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(&self.config, attempt);
                    warn!(
                        "Attempt {}/{} to {} failed: {}. Retrying in {:?}",
                        attempt + 1,
                        attempts,
                        self.inner.name(),
                        err,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(
                            "{} still failing after {} attempts: {}",
                            self.inner.name(),
                            attempts,
                            err
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecodingConfig;
    use crate::llm::client::ScriptedLlmClient;

    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
        }
    }

    fn request() -> ModelRequest {
        ModelRequest::new("hi", DecodingConfig::default())
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay_ms: 500,
            max_delay_ms: 3000,
            backoff_multiplier: 2.0,
        };
        assert_eq!(backoff_delay(&config, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(&config, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(&config, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(&config, 3), Duration::from_millis(3000));
        assert_eq!(backoff_delay(&config, 10), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let client = RetryingClient::new(
            ScriptedLlmClient::new(vec![
                Err(ProviderError::Server {
                    status: 503,
                    message: "overloaded".to_string(),
                }),
                Err(ProviderError::Quota("slow down".to_string())),
                Ok("done".to_string()),
            ]),
            fast(2),
        );
        assert_eq!(client.send(&request()).await.unwrap(), "done");
        assert_eq!(client.inner().call_count().await, 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let client = RetryingClient::new(
            ScriptedLlmClient::new(vec![
                Err(ProviderError::Transport("reset".to_string())),
                Err(ProviderError::Transport("reset".to_string())),
                Ok("too late".to_string()),
            ]),
            fast(1),
        );
        assert!(matches!(
            client.send(&request()).await,
            Err(ProviderError::Transport(_))
        ));
        assert_eq!(client.inner().call_count().await, 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let client = RetryingClient::new(
            ScriptedLlmClient::new(vec![
                Err(ProviderError::Auth {
                    status: 401,
                    message: "bad key".to_string(),
                }),
                Ok("unreachable".to_string()),
            ]),
            fast(3),
        );
        assert!(matches!(
            client.send(&request()).await,
            Err(ProviderError::Auth { .. })
        ));
        assert_eq!(client.inner().call_count().await, 1);
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let client = RetryingClient::new(
            ScriptedLlmClient::new(vec![Err(ProviderError::Timeout(Duration::from_secs(1)))]),
            fast(0),
        );
        assert!(client.send(&request()).await.is_err());
        assert_eq!(client.inner().call_count().await, 1);
    }
}
