//! Campaign entity model.

use serde::Serialize;
use sqlx::FromRow;

use mailroom_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `campaigns` table.
///
/// The counter columns are advisory aggregates owned by the dispatch
/// planner (initialization) and the send worker / event reconciler
/// (atomic increments); the `email_events` log is the audit source of truth.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Campaign {
    pub id: DbId,
    pub organization_id: DbId,
    pub name: String,
    pub subject: String,
    pub html_body: String,
    pub from_name: String,
    pub from_address: String,
    pub utm_params: Option<serde_json::Value>,
    pub scheduled_at: Option<Timestamp>,
    pub status_id: StatusId,
    pub send_started_at: Option<Timestamp>,
    pub send_completed_at: Option<Timestamp>,
    pub total_recipients: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub delivered_count: i64,
    pub open_count: i64,
    pub unique_open_count: i64,
    pub click_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
