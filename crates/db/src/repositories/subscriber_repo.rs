//! Repository for the `subscribers` table.
//!
//! Status transitions are one-way: the terminal-status methods never move a
//! subscriber back to Active, and re-applying the same terminal status is a
//! no-op.

use sqlx::PgPool;

use mailroom_core::types::DbId;

use crate::models::status::SubscriberStatus;
use crate::models::subscriber::Subscriber;

/// Column list for `subscribers` queries.
const COLUMNS: &str = "\
    id, organization_id, email, first_name, last_name, attributes, \
    status_id, created_at, updated_at";

/// Provides lookups and one-way status transitions for subscribers.
pub struct SubscriberRepo;

impl SubscriberRepo {
    /// Fetch a subscriber by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Subscriber>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscribers WHERE id = $1");
        sqlx::query_as::<_, Subscriber>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch a subscriber by (organization, address).
    pub async fn find_by_email(
        pool: &PgPool,
        organization_id: DbId,
        email: &str,
    ) -> Result<Option<Subscriber>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM subscribers WHERE organization_id = $1 AND email = $2");
        sqlx::query_as::<_, Subscriber>(&query)
            .bind(organization_id)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// List Active subscribers for an organization: the eligible audience
    /// for that organization's campaigns.
    pub async fn list_active(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<Vec<Subscriber>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subscribers \
             WHERE organization_id = $1 AND status_id = $2 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, Subscriber>(&query)
            .bind(organization_id)
            .bind(SubscriberStatus::Active.id())
            .fetch_all(pool)
            .await
    }

    /// Transition to Bounced. Returns `true` if the row changed.
    pub async fn mark_bounced(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        Self::set_terminal_status(pool, id, SubscriberStatus::Bounced).await
    }

    /// Transition to Unsubscribed. Returns `true` if the row changed.
    pub async fn mark_unsubscribed(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        Self::set_terminal_status(pool, id, SubscriberStatus::Unsubscribed).await
    }

    /// Transition to Complained. Returns `true` if the row changed.
    pub async fn mark_complained(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        Self::set_terminal_status(pool, id, SubscriberStatus::Complained).await
    }

    async fn set_terminal_status(
        pool: &PgPool,
        id: DbId,
        status: SubscriberStatus,
    ) -> Result<bool, sqlx::Error> {
        debug_assert_ne!(status, SubscriberStatus::Active);
        let result = sqlx::query(
            "UPDATE subscribers SET status_id = $2 WHERE id = $1 AND status_id <> $2",
        )
        .bind(id)
        .bind(status.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
