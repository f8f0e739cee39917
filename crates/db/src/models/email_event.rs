//! Append-only audit log models.

use serde::Serialize;
use sqlx::FromRow;

use mailroom_core::types::{DbId, Timestamp};

use super::status::{EmailEventType, StatusId};

/// A row from the `email_events` table. Rows are never updated or deleted;
/// this log is the sole source of truth for "did this happen", independent
/// of the aggregate campaign counters.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmailEvent {
    pub id: DbId,
    pub campaign_id: Option<DbId>,
    pub subscriber_id: Option<DbId>,
    pub queue_item_id: Option<DbId>,
    pub provider_message_id: Option<String>,
    pub event_type_id: StatusId,
    pub occurred_at: Timestamp,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// Insert payload for [`EmailEventRepo::insert`].
///
/// [`EmailEventRepo::insert`]: crate::repositories::EmailEventRepo::insert
#[derive(Debug, Clone)]
pub struct NewEmailEvent {
    pub campaign_id: Option<DbId>,
    pub subscriber_id: Option<DbId>,
    pub queue_item_id: Option<DbId>,
    pub provider_message_id: Option<String>,
    pub event_type: EmailEventType,
    pub occurred_at: Timestamp,
    pub metadata: serde_json::Value,
}
