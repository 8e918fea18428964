//! Shared HTTP provider configuration.

use std::time::Duration;

use reqwest::Client;

use crate::error::{ProviderError, ProviderResult};

/// Connection settings for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the provider API
    pub base_url: String,
    /// API key sent with every request
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Create config from `{PREFIX}_BASE_URL`, `{PREFIX}_API_KEY` and
    /// `{PREFIX}_TIMEOUT_SECS`.
    pub fn from_env(prefix: &str, default_base_url: &str) -> ProviderResult<Self> {
        let key_var = format!("{}_API_KEY", prefix);
        let api_key = std::env::var(&key_var)
            .map_err(|_| ProviderError::config(format!("{} not set", key_var)))?;

        Ok(Self {
            base_url: std::env::var(format!("{}_BASE_URL", prefix))
                .unwrap_or_else(|_| default_base_url.to_string()),
            api_key,
            timeout: Duration::from_secs(
                std::env::var(format!("{}_TIMEOUT_SECS", prefix))
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a tuned HTTP client for this provider.
    pub(crate) fn http_client(&self, agent: &str) -> ProviderResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(format!("{}/{}", agent, env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ProviderError::Network)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
