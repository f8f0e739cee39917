//! Suppression list entry model.

use serde::Serialize;
use sqlx::FromRow;

use mailroom_core::types::{DbId, Timestamp};

/// A row from the `suppression_list` table: a standing block preventing an
/// address from receiving further mail for an organization. Keyed uniquely
/// on (organization, email) so repeated suppressions are idempotent upserts.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SuppressionListEntry {
    pub id: DbId,
    pub organization_id: DbId,
    pub email: String,
    pub reason: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
