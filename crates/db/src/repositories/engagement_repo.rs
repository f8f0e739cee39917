//! Repository for the `engagement_records` table.
//!
//! Scores accumulate as atomic increments against the current stored value
//! without a prior read, so the [0, 100] clamp is a follow-up corrective
//! write.
//! Between the two statements the stored value can transiently leave the
//! bounds; callers must tolerate that window.

use sqlx::PgPool;

use mailroom_core::engagement::{BASELINE_SCORE, MAX_SCORE, MIN_SCORE};
use mailroom_core::types::DbId;

use crate::models::engagement::EngagementRecord;

/// Column list for `engagement_records` queries.
const COLUMNS: &str =
    "id, subscriber_id, engagement_score, last_event_at, created_at, updated_at";

/// Provides the increment-then-clamp score accumulation.
pub struct EngagementRepo;

impl EngagementRepo {
    /// Apply a signed delta, creating the record at baseline 50 first if
    /// absent. Returns the raw post-increment score, which may lie outside
    /// [0, 100] until [`clamp`](Self::clamp) runs.
    pub async fn apply_delta(
        pool: &PgPool,
        subscriber_id: DbId,
        delta: i32,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO engagement_records (subscriber_id, engagement_score, last_event_at) \
             VALUES ($1, $2 + $3, NOW()) \
             ON CONFLICT (subscriber_id) DO UPDATE \
             SET engagement_score = engagement_records.engagement_score + $3, \
                 last_event_at = NOW() \
             RETURNING engagement_score",
        )
        .bind(subscriber_id)
        .bind(BASELINE_SCORE)
        .bind(delta)
        .fetch_one(pool)
        .await
    }

    /// Force the score to exactly zero (spam complaint), creating the
    /// record if absent. Not a delta.
    pub async fn reset_to_zero(pool: &PgPool, subscriber_id: DbId) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO engagement_records (subscriber_id, engagement_score, last_event_at) \
             VALUES ($1, $2, NOW()) \
             ON CONFLICT (subscriber_id) DO UPDATE \
             SET engagement_score = $2, last_event_at = NOW() \
             RETURNING engagement_score",
        )
        .bind(subscriber_id)
        .bind(MIN_SCORE)
        .fetch_one(pool)
        .await
    }

    /// Corrective write pinning the stored score into [0, 100]. Returns the
    /// stored (clamped) score.
    pub async fn clamp(pool: &PgPool, subscriber_id: DbId) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE engagement_records \
             SET engagement_score = LEAST(GREATEST(engagement_score, $2), $3) \
             WHERE subscriber_id = $1 \
             RETURNING engagement_score",
        )
        .bind(subscriber_id)
        .bind(MIN_SCORE)
        .bind(MAX_SCORE)
        .fetch_one(pool)
        .await
    }

    /// Fetch a subscriber's engagement record.
    pub async fn find_by_subscriber(
        pool: &PgPool,
        subscriber_id: DbId,
    ) -> Result<Option<EngagementRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM engagement_records WHERE subscriber_id = $1");
        sqlx::query_as::<_, EngagementRecord>(&query)
            .bind(subscriber_id)
            .fetch_optional(pool)
            .await
    }
}
