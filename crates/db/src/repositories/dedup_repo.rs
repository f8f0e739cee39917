//! Repository for the `dedup_keys` table.
//!
//! The open/click dedup check must be a race-free check-then-set: two
//! concurrent webhook deliveries for the same engagement must not both
//! observe "absent". [`set_if_absent`](DedupRepo::set_if_absent) is a single
//! atomic statement (an upsert whose conflict arm only fires for expired
//! rows), so exactly one caller wins within a TTL window.

use std::time::Duration;

use sqlx::PgPool;

/// Provides the atomic set-if-absent-with-TTL primitive and key deletion.
pub struct DedupRepo;

impl DedupRepo {
    /// Record `key` unless an unexpired entry already exists.
    ///
    /// Returns `true` when this call created (or revived an expired) entry,
    /// i.e. the key was absent and the caller owns this window.
    pub async fn set_if_absent(
        pool: &PgPool,
        key: &str,
        ttl: Duration,
    ) -> Result<bool, sqlx::Error> {
        let claimed: Option<String> = sqlx::query_scalar(
            "INSERT INTO dedup_keys (key, expires_at) \
             VALUES ($1, NOW() + make_interval(secs => $2)) \
             ON CONFLICT (key) DO UPDATE \
             SET expires_at = EXCLUDED.expires_at \
             WHERE dedup_keys.expires_at <= NOW() \
             RETURNING key",
        )
        .bind(key)
        .bind(ttl.as_secs_f64())
        .fetch_optional(pool)
        .await?;
        Ok(claimed.is_some())
    }

    /// Drop a key (cache invalidation).
    pub async fn delete(pool: &PgPool, key: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM dedup_keys WHERE key = $1")
            .bind(key)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Remove expired keys. Returns the number deleted.
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dedup_keys WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
