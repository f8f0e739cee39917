//! Subscriber entity model.

use serde::Serialize;
use sqlx::FromRow;

use mailroom_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `subscribers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscriber {
    pub id: DbId,
    pub organization_id: DbId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Free-form attributes merged into the personalization field map.
    pub attributes: serde_json::Value,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
