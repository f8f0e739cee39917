//! Engagement record model.

use serde::Serialize;
use sqlx::FromRow;

use mailroom_core::types::{DbId, Timestamp};

/// A row from the `engagement_records` table: one per subscriber.
///
/// The score is held in [0, 100] after the corrective clamp step; between
/// the atomic increment and the clamp it may transiently leave the bounds.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EngagementRecord {
    pub id: DbId,
    pub subscriber_id: DbId,
    pub engagement_score: i32,
    pub last_event_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
