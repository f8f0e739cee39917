//! The cache contract used for engagement dedup and score-cache
//! invalidation.
//!
//! The only operation with correctness weight is `set_if_absent`: two
//! concurrent webhook deliveries of the same open must not both observe
//! "absent", so implementations must make the check-then-set atomic.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use mailroom_core::types::DbId;
use mailroom_db::repositories::DedupRepo;
use mailroom_db::DbPool;

/// TTL for open/click dedup keys. Within this window a repeated engagement
/// is recognized as non-unique.
pub const ENGAGEMENT_DEDUP_TTL: Duration = Duration::from_secs(30 * 60);

/// Dedup key for one engagement: (subscriber, campaign, kind).
pub fn engagement_key(subscriber_id: DbId, campaign_id: DbId, kind: &str) -> String {
    format!("engagement:{subscriber_id}:{campaign_id}:{kind}")
}

/// Cache key for a subscriber's derived engagement score.
pub fn score_cache_key(subscriber_id: DbId) -> String {
    format!("score:{subscriber_id}")
}

/// Error type for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// The cache seam consumed by the reconciler and scorer.
#[async_trait::async_trait]
pub trait DedupCache: Send + Sync {
    /// Atomically record `key` unless an unexpired entry exists. Returns
    /// `true` when this caller owns the window.
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Drop a key (invalidation).
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Postgres-backed cache on the `dedup_keys` table. The atomicity of
/// `set_if_absent` comes from a single upsert statement.
pub struct PgDedupCache {
    pool: DbPool,
}

impl PgDedupCache {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DedupCache for PgDedupCache {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        Ok(DedupRepo::set_if_absent(&self.pool, key, ttl).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        Ok(DedupRepo::delete(&self.pool, key).await?)
    }
}

/// In-memory cache for tests and single-process deployments. The mutex
/// makes the check-then-set atomic within the process.
#[derive(Default)]
pub struct MemoryDedupCache {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemoryDedupCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DedupCache for MemoryDedupCache {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, expires_at| *expires_at > now);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), now + ttl);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
