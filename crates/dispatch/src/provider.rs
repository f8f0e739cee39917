//! The delivery-provider send contract.

use mailroom_core::types::DbId;

/// Identifiers threaded through the provider so webhook events can be
/// correlated back to local state.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CorrelationMetadata {
    pub queue_item_id: DbId,
    pub campaign_id: DbId,
    pub subscriber_id: DbId,
}

/// One fully personalized outbound message.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub from_name: String,
    pub from_address: String,
    pub subject: String,
    pub html: String,
    pub correlation: CorrelationMetadata,
    /// Provider-side tags (e.g. the campaign) for the provider's own stats.
    pub categories: Vec<String>,
}

/// Successful submission acknowledgement.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub provider_message_id: String,
}

/// Error type for provider submission failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network-level or provider-internal failure; typically transient.
    #[error("provider transport error: {0}")]
    Transport(String),

    /// The provider rejected the message content or request.
    #[error("message rejected by provider: {0}")]
    Rejected(String),

    /// The recipient or sender address could not be used.
    #[error("invalid address: {0}")]
    Address(String),

    /// The MIME message could not be assembled.
    #[error("message build error: {0}")]
    Build(String),
}

impl ProviderError {
    /// Whether this failure is known to be permanent.
    ///
    /// Used for logging only: the retry policy deliberately does not
    /// distinguish permanent from transient failures before the attempt
    /// cap. Do not change that without product sign-off.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Address(_) | Self::Build(_))
    }
}

/// The provider seam: everything the send worker knows about delivery.
#[async_trait::async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, message: &OutboundEmail) -> Result<ProviderResponse, ProviderError>;
}
