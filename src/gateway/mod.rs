//! Provider gateway for generative chat completions.
//!
//! The gateway owns the bounded-retry half of the invocation policy: up to
//! `max_retries` re-attempts on retryable transport/API failures with
//! exponential backoff. The empty-body simplified-prompt fallback is the
//! detector layer's job, since only it knows its own simplified prompt.

pub mod error;
pub mod openrouter;
pub mod types;

use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use openrouter::ChatProvider;

pub use error::{ErrorContext, ProviderError};
pub use openrouter::OpenRouterAdapter;
pub use types::*;

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// Retrying gateway over any [`ChatProvider`].
pub struct ProviderGateway<P: ChatProvider> {
    provider: P,
    config: GatewayConfig,
}

#[async_trait::async_trait]
impl<P: ChatProvider> ChatGateway for ProviderGateway<P> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        ProviderGateway::chat(self, req).await
    }
}

impl ProviderGateway<OpenRouterAdapter> {
    pub fn from_env() -> Result<Self, ProviderError> {
        let provider = OpenRouterAdapter::from_env()?;
        Ok(Self {
            provider,
            config: GatewayConfig::default(),
        })
    }
}

impl<P: ChatProvider> ProviderGateway<P> {
    pub fn with_config(provider: P, config: GatewayConfig) -> Self {
        Self { provider, config }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..=self.config.max_retries {
            match self.provider.chat(&req).await {
                Ok(resp) => return Ok(resp),
                Err(err) => {
                    if !err.is_retryable() || attempt == self.config.max_retries {
                        return Err(err);
                    }

                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        code = err.code(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "provider call failed, retrying"
                    );
                    last_error = Some(err);
                    sleep(delay).await;
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::provider("openrouter", "unknown error", false)))
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let multiplier = 2u64.pow(attempt.min(5));
    base * multiplier as u32
}
