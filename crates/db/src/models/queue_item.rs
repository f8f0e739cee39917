//! Queue item entity model and creation DTO.

use serde::Serialize;
use sqlx::FromRow;

use mailroom_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `queue_items` table: one per (campaign, subscriber) pair.
///
/// Subject and body are snapshots taken at enqueue time; a campaign edited
/// mid-send does not retroactively alter already-queued items. The row id
/// doubles as the durable queue's job id.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueItem {
    pub id: DbId,
    pub campaign_id: DbId,
    pub subscriber_id: DbId,
    pub subject: String,
    pub html_body: String,
    pub field_map: serde_json::Value,
    pub status_id: StatusId,
    pub retry_count: i32,
    pub provider_message_id: Option<String>,
    pub last_error: Option<String>,
    pub sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert payload for [`QueueItemRepo::create_or_reuse`].
///
/// [`QueueItemRepo::create_or_reuse`]: crate::repositories::QueueItemRepo::create_or_reuse
#[derive(Debug, Clone)]
pub struct NewQueueItem {
    pub campaign_id: DbId,
    pub subscriber_id: DbId,
    pub subject: String,
    pub html_body: String,
    pub field_map: serde_json::Value,
}
