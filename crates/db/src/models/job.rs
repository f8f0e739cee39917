//! Durable queue job model and submission DTO.

use serde::Serialize;
use sqlx::FromRow;

use mailroom_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `jobs` table.
///
/// The primary key is supplied by the caller (the queue item id), which is
/// what makes enqueue idempotent: re-submitting an existing id is a no-op.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub status_id: StatusId,
    /// Number of times the job has been claimed for processing.
    pub attempts: i32,
    pub max_attempts: i32,
    pub backoff_base_secs: i64,
    pub next_attempt_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert payload for [`JobRepo::insert`].
///
/// [`JobRepo::insert`]: crate::repositories::JobRepo::insert
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Caller-supplied job id (the queue item id for send jobs).
    pub id: DbId,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub max_attempts: i32,
    pub backoff_base_secs: i64,
}
