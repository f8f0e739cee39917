//! Repository for the append-only `email_events` audit log.
//!
//! Insert-only by design. There is no update or delete method; the log is
//! the authoritative record of what happened, independent of the advisory
//! campaign counters.

use sqlx::PgPool;

use mailroom_core::types::DbId;

use crate::models::email_event::{EmailEvent, NewEmailEvent};
use crate::models::status::EmailEventType;

/// Column list for `email_events` queries.
const COLUMNS: &str = "\
    id, campaign_id, subscriber_id, queue_item_id, provider_message_id, \
    event_type_id, occurred_at, metadata, created_at";

/// Provides insert and read operations for the audit log.
pub struct EmailEventRepo;

impl EmailEventRepo {
    /// Append an event, returning the generated id.
    pub async fn insert(pool: &PgPool, event: &NewEmailEvent) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO email_events \
                (campaign_id, subscriber_id, queue_item_id, provider_message_id, \
                 event_type_id, occurred_at, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(event.campaign_id)
        .bind(event.subscriber_id)
        .bind(event.queue_item_id)
        .bind(&event.provider_message_id)
        .bind(event.event_type.id())
        .bind(event.occurred_at)
        .bind(&event.metadata)
        .fetch_one(pool)
        .await
    }

    /// List a campaign's events, newest first.
    pub async fn list_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EmailEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_events \
             WHERE campaign_id = $1 \
             ORDER BY occurred_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, EmailEvent>(&query)
            .bind(campaign_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count a campaign's events of one type.
    pub async fn count_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
        event_type: EmailEventType,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM email_events \
             WHERE campaign_id = $1 AND event_type_id = $2",
        )
        .bind(campaign_id)
        .bind(event_type.id())
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }
}
