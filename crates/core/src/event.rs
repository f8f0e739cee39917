//! Provider delivery-event kinds.
//!
//! Webhook payloads tag events with a free-form string. The reconciler
//! dispatches over this closed enum; tags that do not map to a variant are
//! logged and ignored so new provider event kinds never break ingestion.

use serde::Serialize;

/// A recognized delivery-provider event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderEventKind {
    Delivered,
    Opened,
    Clicked,
    Bounced,
    Unsubscribed,
    SpamComplaint,
}

impl ProviderEventKind {
    /// Canonical lowercase name, also used in dedup cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Opened => "open",
            Self::Clicked => "click",
            Self::Bounced => "bounce",
            Self::Unsubscribed => "unsubscribe",
            Self::SpamComplaint => "spam_complaint",
        }
    }

    /// Map a provider event tag to a kind.
    ///
    /// Accepts both the short tags providers put on webhook payloads
    /// (`"open"`, `"click"`, `"bounce"`, `"spamreport"`) and the past-tense
    /// spellings some providers use. Returns `None` for unrecognized tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "delivered" | "delivery" => Some(Self::Delivered),
            "open" | "opened" => Some(Self::Opened),
            "click" | "clicked" => Some(Self::Clicked),
            "bounce" | "bounced" => Some(Self::Bounced),
            "unsubscribe" | "unsubscribed" => Some(Self::Unsubscribed),
            "spamreport" | "spam_report" | "spam_complaint" | "complaint" => {
                Some(Self::SpamComplaint)
            }
            _ => None,
        }
    }
}
