//! Unsubscribe record model.

use serde::Serialize;
use sqlx::FromRow;

use mailroom_core::types::{DbId, Timestamp};

/// A row from the `unsubscribe_records` table, noting when a subscriber
/// opted out and which campaign triggered it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UnsubscribeRecord {
    pub id: DbId,
    pub subscriber_id: DbId,
    pub campaign_id: Option<DbId>,
    pub unsubscribed_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
