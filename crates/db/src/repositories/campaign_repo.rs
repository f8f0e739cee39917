//! Repository for the `campaigns` table.
//!
//! Counter columns are mutated exclusively through the atomic increment
//! methods below, never read-modify-write, because many send workers and
//! reconcilers update the same row concurrently.

use sqlx::PgPool;

use mailroom_core::types::DbId;

use crate::models::campaign::Campaign;
use crate::models::status::CampaignStatus;

/// Column list for `campaigns` queries.
const COLUMNS: &str = "\
    id, organization_id, name, subject, html_body, from_name, from_address, \
    utm_params, scheduled_at, status_id, send_started_at, send_completed_at, \
    total_recipients, sent_count, failed_count, delivered_count, \
    open_count, unique_open_count, click_count, \
    created_at, updated_at";

/// Provides read and state-transition operations for campaigns.
pub struct CampaignRepo;

impl CampaignRepo {
    /// Fetch a campaign by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Campaign>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM campaigns WHERE id = $1");
        sqlx::query_as::<_, Campaign>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List queued campaigns whose scheduled time has passed (or that have
    /// no scheduled time at all). Oldest first.
    pub async fn list_due(pool: &PgPool, limit: i64) -> Result<Vec<Campaign>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaigns \
             WHERE status_id = $1 \
               AND (scheduled_at IS NULL OR scheduled_at <= NOW()) \
             ORDER BY scheduled_at ASC NULLS FIRST, id ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(CampaignStatus::Queued.id())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// List campaigns in a given status, oldest first.
    pub async fn list_by_status(
        pool: &PgPool,
        status: CampaignStatus,
        limit: i64,
    ) -> Result<Vec<Campaign>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaigns \
             WHERE status_id = $1 \
             ORDER BY id ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(status.id())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Transition Queued -> Sending, stamping the send start and the final
    /// recipient total. Guarded on the current status so a re-run of the
    /// planner after completion is a no-op.
    ///
    /// Returns `true` if the transition happened.
    pub async fn mark_sending(
        pool: &PgPool,
        id: DbId,
        total_recipients: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE campaigns \
             SET status_id = $2, total_recipients = $3, send_started_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(CampaignStatus::Sending.id())
        .bind(total_recipients)
        .bind(CampaignStatus::Queued.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a campaign Failed after a batch-level planning error.
    pub async fn mark_failed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET status_id = $2 WHERE id = $1")
            .bind(id)
            .bind(CampaignStatus::Failed.id())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Transition Sending -> Sent once no queue item is still queued or
    /// sending and no backing job is pending or running. The whole check is
    /// one guarded UPDATE so concurrent scheduler runs stay idempotent.
    ///
    /// Returns `true` if the campaign was completed by this call.
    pub async fn complete_if_drained(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE campaigns \
             SET status_id = $2, send_completed_at = NOW() \
             WHERE id = $1 \
               AND status_id = $3 \
               AND NOT EXISTS ( \
                   SELECT 1 FROM queue_items \
                   WHERE campaign_id = $1 AND status_id IN ($4, $5) \
               ) \
               AND NOT EXISTS ( \
                   SELECT 1 FROM jobs j \
                   JOIN queue_items qi ON qi.id = j.id \
                   WHERE qi.campaign_id = $1 AND j.status_id IN ($6, $7) \
               )",
        )
        .bind(id)
        .bind(CampaignStatus::Sent.id())
        .bind(CampaignStatus::Sending.id())
        .bind(crate::models::QueueItemStatus::Queued.id())
        .bind(crate::models::QueueItemStatus::Sending.id())
        .bind(crate::models::JobStatus::Pending.id())
        .bind(crate::models::JobStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically add one to `sent_count`.
    pub async fn increment_sent(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET sent_count = sent_count + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Atomically add one to `failed_count`.
    pub async fn increment_failed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET failed_count = failed_count + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Atomically add one to `delivered_count`.
    pub async fn increment_delivered(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET delivered_count = delivered_count + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Atomically add one to `open_count`, and to `unique_open_count` as
    /// well when this open is the first within the dedup window.
    pub async fn increment_opens(
        pool: &PgPool,
        id: DbId,
        first_in_window: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE campaigns \
             SET open_count = open_count + 1, \
                 unique_open_count = unique_open_count + CASE WHEN $2 THEN 1 ELSE 0 END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(first_in_window)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Atomically add one to `click_count`.
    pub async fn increment_clicks(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET click_count = click_count + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
