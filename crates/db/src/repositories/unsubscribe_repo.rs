//! Repository for the `unsubscribe_records` table.

use sqlx::PgPool;

use mailroom_core::types::{DbId, Timestamp};

/// Provides insert operations for unsubscribe records.
pub struct UnsubscribeRepo;

impl UnsubscribeRepo {
    /// Record an unsubscribe, noting the campaign that triggered it.
    pub async fn insert(
        pool: &PgPool,
        subscriber_id: DbId,
        campaign_id: Option<DbId>,
        unsubscribed_at: Timestamp,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO unsubscribe_records (subscriber_id, campaign_id, unsubscribed_at) \
             VALUES ($1, $2, $3) \
             RETURNING id",
        )
        .bind(subscriber_id)
        .bind(campaign_id)
        .bind(unsubscribed_at)
        .fetch_one(pool)
        .await
    }
}
