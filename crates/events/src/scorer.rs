//! Engagement scorer: bounded accumulation of a subscriber's lifetime
//! engagement score.

use std::sync::Arc;

use mailroom_core::engagement::ScoreDelta;
use mailroom_core::types::DbId;
use mailroom_db::repositories::EngagementRepo;
use mailroom_db::DbPool;

use crate::dedup::{score_cache_key, DedupCache};

/// Applies score deltas with the increment-then-clamp discipline and
/// invalidates the derived-score cache afterwards.
pub struct EngagementScorer {
    pool: DbPool,
    cache: Arc<dyn DedupCache>,
}

impl EngagementScorer {
    pub fn new(pool: DbPool, cache: Arc<dyn DedupCache>) -> Self {
        Self { pool, cache }
    }

    /// Apply one delta and return the stored (clamped) score.
    ///
    /// The increment is atomic against the current stored value without a
    /// prior read, so the clamp is a follow-up corrective write; concurrent
    /// callers can observe a transiently out-of-range stored value between
    /// the two statements.
    pub async fn apply(&self, subscriber_id: DbId, delta: ScoreDelta) -> Result<i32, sqlx::Error> {
        let score = match delta.increment() {
            Some(increment) => {
                let raw = EngagementRepo::apply_delta(&self.pool, subscriber_id, increment).await?;
                let clamped = EngagementRepo::clamp(&self.pool, subscriber_id).await?;
                if raw != clamped {
                    tracing::debug!(
                        subscriber_id,
                        raw,
                        clamped,
                        "Engagement score clamped into bounds"
                    );
                }
                clamped
            }
            // Spam complaint: hard reset, not a delta.
            None => EngagementRepo::reset_to_zero(&self.pool, subscriber_id).await?,
        };

        // The cache is advisory; a failed invalidation is logged, not fatal.
        if let Err(err) = self.cache.delete(&score_cache_key(subscriber_id)).await {
            tracing::warn!(
                subscriber_id,
                error = %err,
                "Failed to invalidate cached engagement score"
            );
        }

        tracing::debug!(subscriber_id, ?delta, score, "Engagement score updated");
        Ok(score)
    }
}
