//! Repository for the `suppression_list` table.

use sqlx::PgPool;

use mailroom_core::types::DbId;

/// Provides the suppression gate lookup and idempotent upserts.
pub struct SuppressionRepo;

impl SuppressionRepo {
    /// The suppression gate: is this address blocked for this organization?
    /// Pure lookup, no side effects.
    pub async fn is_suppressed(
        pool: &PgPool,
        organization_id: DbId,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let exists: Option<bool> = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM suppression_list \
                 WHERE organization_id = $1 AND email = $2 \
             )",
        )
        .bind(organization_id)
        .bind(email)
        .fetch_one(pool)
        .await?;
        Ok(exists.unwrap_or(false))
    }

    /// Add an address to the suppression list, or refresh the reason if it
    /// is already present. Repeated suppressions never duplicate rows.
    pub async fn upsert(
        pool: &PgPool,
        organization_id: DbId,
        email: &str,
        reason: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO suppression_list (organization_id, email, reason) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (organization_id, email) \
             DO UPDATE SET reason = EXCLUDED.reason \
             RETURNING id",
        )
        .bind(organization_id)
        .bind(email)
        .bind(reason)
        .fetch_one(pool)
        .await
    }
}
