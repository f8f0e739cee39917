//! Repository for the `queue_items` table.
//!
//! The `(campaign_id, subscriber_id)` unique constraint is the planner's
//! idempotency key: re-planning a campaign reuses existing rows instead of
//! creating duplicates.

use sqlx::PgPool;

use mailroom_core::types::DbId;

use crate::models::queue_item::{NewQueueItem, QueueItem};
use crate::models::status::QueueItemStatus;

/// Column list for `queue_items` queries.
const COLUMNS: &str = "\
    id, campaign_id, subscriber_id, subject, html_body, field_map, \
    status_id, retry_count, provider_message_id, last_error, sent_at, \
    created_at, updated_at";

/// Provides creation and state transitions for per-recipient queue items.
pub struct QueueItemRepo;

impl QueueItemRepo {
    /// Insert a queue item for a (campaign, subscriber) pair, or return the
    /// existing one. The insert races safely: `ON CONFLICT DO NOTHING`
    /// followed by a fetch of whichever row won.
    pub async fn create_or_reuse(
        pool: &PgPool,
        input: &NewQueueItem,
    ) -> Result<QueueItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO queue_items \
                (campaign_id, subscriber_id, subject, html_body, field_map) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (campaign_id, subscriber_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, QueueItem>(&query)
            .bind(input.campaign_id)
            .bind(input.subscriber_id)
            .bind(&input.subject)
            .bind(&input.html_body)
            .bind(&input.field_map)
            .fetch_optional(pool)
            .await?;

        match inserted {
            Some(item) => Ok(item),
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM queue_items \
                     WHERE campaign_id = $1 AND subscriber_id = $2"
                );
                sqlx::query_as::<_, QueueItem>(&query)
                    .bind(input.campaign_id)
                    .bind(input.subscriber_id)
                    .fetch_one(pool)
                    .await
            }
        }
    }

    /// Fetch a queue item by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<QueueItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queue_items WHERE id = $1");
        sqlx::query_as::<_, QueueItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark Sending and stamp `sent_at` at the start of a delivery attempt.
    pub async fn mark_sending(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE queue_items SET status_id = $2, sent_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(QueueItemStatus::Sending.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark Sent with the provider's message id.
    pub async fn mark_sent(
        pool: &PgPool,
        id: DbId,
        provider_message_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE queue_items \
             SET status_id = $2, provider_message_id = $3, last_error = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .bind(QueueItemStatus::Sent.id())
        .bind(provider_message_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark Failed with the error text and bump the retry counter.
    pub async fn mark_failed(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE queue_items \
             SET status_id = $2, last_error = $3, retry_count = retry_count + 1 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(QueueItemStatus::Failed.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Count items for a campaign in a given status.
    pub async fn count_by_status(
        pool: &PgPool,
        campaign_id: DbId,
        status: QueueItemStatus,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM queue_items WHERE campaign_id = $1 AND status_id = $2",
        )
        .bind(campaign_id)
        .bind(status.id())
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }
}
