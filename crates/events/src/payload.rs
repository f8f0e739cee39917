//! Provider webhook payload shape.
//!
//! Deliberately lenient: providers vary in which fields they send, and the
//! correlation ids threaded through at send time are optional because not
//! every provider echoes custom arguments on every event kind. Everything
//! except the event tag is optional; the reconciler works with whatever is
//! present.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use mailroom_core::event::ProviderEventKind;
use mailroom_core::types::{DbId, Timestamp};

/// One event from the provider's webhook batch.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEvent {
    /// Provider event tag, e.g. `"open"`, `"bounce"`, `"spamreport"`.
    pub event: String,

    /// Recipient address.
    #[serde(default)]
    pub email: Option<String>,

    /// Unix timestamp of the event at the provider.
    #[serde(default)]
    pub timestamp: Option<i64>,

    /// The provider's message id for correlation against queue items.
    #[serde(default, alias = "sg_message_id")]
    pub provider_message_id: Option<String>,

    // Correlation metadata echoed back from send-time custom arguments.
    #[serde(default)]
    pub campaign_id: Option<DbId>,
    #[serde(default)]
    pub subscriber_id: Option<DbId>,
    #[serde(default)]
    pub queue_item_id: Option<DbId>,

    /// Clicked URL, present on click events.
    #[serde(default)]
    pub url: Option<String>,

    /// Failure or bounce reason, present on bounce events.
    #[serde(default)]
    pub reason: Option<String>,

    /// Bounce classification (`"hard"` / `"soft"`), present on bounce events.
    #[serde(default, alias = "bounce_classification")]
    pub bounce_type: Option<String>,
}

impl ProviderEvent {
    /// Map the event tag to a recognized kind, or `None` for tags this
    /// subsystem does not handle.
    pub fn kind(&self) -> Option<ProviderEventKind> {
        ProviderEventKind::from_tag(&self.event)
    }

    /// The provider's event time, falling back to now when the payload
    /// carries no usable timestamp.
    pub fn occurred_at(&self) -> Timestamp {
        self.timestamp
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now)
    }
}
