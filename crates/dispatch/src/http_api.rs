//! HTTP JSON-API delivery provider.
//!
//! Posts one message per request to the provider's send endpoint, carrying
//! the correlation metadata as custom arguments so the provider echoes it
//! back on webhook events. 4xx responses are mapped to rejection errors,
//! everything else transport errors; the retry cap treats both the same.

use std::time::Duration;

use serde::Deserialize;

use crate::provider::{EmailProvider, OutboundEmail, ProviderError, ProviderResponse};

/// HTTP request timeout for a single submission attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the HTTP-API provider.
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// Full URL of the provider's send endpoint.
    pub endpoint: String,
    /// Bearer token for the provider API.
    pub api_key: String,
}

impl HttpApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `MAIL_API_ENDPOINT` is not set.
    ///
    /// | Variable            | Required | Default |
    /// |---------------------|----------|---------|
    /// | `MAIL_API_ENDPOINT` | yes      | —       |
    /// | `MAIL_API_KEY`      | no       | empty   |
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("MAIL_API_ENDPOINT").ok()?;
        Some(Self {
            endpoint,
            api_key: std::env::var("MAIL_API_KEY").unwrap_or_default(),
        })
    }
}

/// Acknowledgement body returned by the provider.
#[derive(Debug, Deserialize)]
struct SendAck {
    message_id: String,
}

/// Sends campaign messages through a provider's HTTP JSON API.
pub struct HttpApiProvider {
    config: HttpApiConfig,
    client: reqwest::Client,
}

impl HttpApiProvider {
    pub fn new(config: HttpApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { config, client }
    }
}

#[async_trait::async_trait]
impl EmailProvider for HttpApiProvider {
    async fn send(&self, message: &OutboundEmail) -> Result<ProviderResponse, ProviderError> {
        let payload = serde_json::json!({
            "to": message.to,
            "from": {
                "name": message.from_name,
                "address": message.from_address,
            },
            "subject": message.subject,
            "html": message.html,
            "custom_args": message.correlation,
            "categories": message.categories,
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected(format!("HTTP {status}: {body}")));
        }
        if !status.is_success() {
            return Err(ProviderError::Transport(format!("HTTP {status}")));
        }

        let ack: SendAck = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(format!("malformed ack: {e}")))?;

        Ok(ProviderResponse {
            provider_message_id: ack.message_id,
        })
    }
}
