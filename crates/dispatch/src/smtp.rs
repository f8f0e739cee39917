//! SMTP delivery via the `lettre` async transport.
//!
//! Configuration is loaded from environment variables; if `SMTP_HOST` is not
//! set, [`SmtpConfig::from_env`] returns `None` and this provider should not
//! be constructed. SMTP has no provider-assigned message id, so the Message-ID
//! header is set deterministically from the correlation metadata and returned
//! as the provider message id.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::provider::{EmailProvider, OutboundEmail, ProviderError, ProviderResponse};

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Configuration for the SMTP provider.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port (defaults to 587).
    pub port: u16,
    /// Optional SMTP username.
    pub user: Option<String>,
    /// Optional SMTP password.
    pub password: Option<String>,
}

impl SmtpConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that SMTP
    /// delivery is not configured.
    ///
    /// | Variable        | Required | Default |
    /// |-----------------|----------|---------|
    /// | `SMTP_HOST`     | yes      | —       |
    /// | `SMTP_PORT`     | no       | `587`   |
    /// | `SMTP_USER`     | no       | —       |
    /// | `SMTP_PASSWORD` | no       | —       |
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            host,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            user: std::env::var("SMTP_USER").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

/// Sends campaign messages over SMTP.
pub struct SmtpProvider {
    config: SmtpConfig,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Deterministic Message-ID for one queue item, doubling as the
    /// provider message id reported back to the pipeline.
    fn message_id(&self, message: &OutboundEmail) -> String {
        format!(
            "<qi{}.c{}.s{}@{}>",
            message.correlation.queue_item_id,
            message.correlation.campaign_id,
            message.correlation.subscriber_id,
            self.config.host
        )
    }
}

#[async_trait::async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, message: &OutboundEmail) -> Result<ProviderResponse, ProviderError> {
        let message_id = self.message_id(message);

        let from = format!("{} <{}>", message.from_name, message.from_address)
            .parse()
            .map_err(|e: lettre::address::AddressError| ProviderError::Address(e.to_string()))?;
        let to = message
            .to
            .parse()
            .map_err(|e: lettre::address::AddressError| ProviderError::Address(e.to_string()))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(&message.subject)
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
            .map_err(|e| ProviderError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                .map_err(|e| ProviderError::Transport(e.to_string()))?
                .port(self.config.port);

        if let (Some(user), Some(pass)) = (&self.config.user, &self.config.password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        let response = mailer
            .send(email)
            .await
            .map_err(|e| {
                if e.is_permanent() {
                    ProviderError::Rejected(e.to_string())
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        if !response.is_positive() {
            return Err(ProviderError::Rejected(format!(
                "SMTP response code {}",
                response.code()
            )));
        }

        Ok(ProviderResponse {
            provider_message_id: message_id,
        })
    }
}
