//! Repository for the `jobs` table backing the durable queue.
//!
//! Claiming uses `FOR UPDATE SKIP LOCKED` so each job is delivered to at
//! most one worker at a time even with many concurrent consumers. Retry
//! scheduling and terminal failure are separate guarded updates driven by
//! the queue runtime.

use std::time::Duration;

use sqlx::PgPool;

use mailroom_core::types::DbId;

use crate::models::job::{Job, NewJob};
use crate::models::status::JobStatus;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, job_type, payload, priority, status_id, attempts, max_attempts, \
    backoff_base_secs, next_attempt_at, claimed_at, completed_at, last_error, \
    created_at, updated_at";

/// Provides enqueue, claim, and completion operations for queue jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a job with a caller-supplied id.
    ///
    /// Returns `false` when a job with this id already exists; this is the
    /// deduplication that makes planner re-runs safe.
    pub async fn insert(pool: &PgPool, job: &NewJob) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO jobs \
                (id, job_type, payload, priority, max_attempts, backoff_base_secs) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(job.id)
        .bind(&job.job_type)
        .bind(&job.payload)
        .bind(job.priority)
        .bind(job.max_attempts)
        .bind(job.backoff_base_secs)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert a batch of jobs in one transaction. Returns the number of
    /// jobs actually inserted (duplicates are skipped, not errors).
    pub async fn insert_batch(pool: &PgPool, jobs: &[NewJob]) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut inserted = 0;
        for job in jobs {
            let result = sqlx::query(
                "INSERT INTO jobs \
                    (id, job_type, payload, priority, max_attempts, backoff_base_secs) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(job.id)
            .bind(&job.job_type)
            .bind(&job.payload)
            .bind(job.priority)
            .bind(job.max_attempts)
            .bind(job.backoff_base_secs)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Atomically claim the next due pending job.
    ///
    /// Picks by priority DESC then earliest due time, using
    /// `FOR UPDATE SKIP LOCKED` to prevent double-dispatch across workers.
    /// The claim bumps `attempts`, so a job's attempt number is its
    /// post-claim `attempts` value.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $1, claimed_at = NOW(), attempts = attempts + 1 \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status_id = $2 AND next_attempt_at <= NOW() \
                 ORDER BY priority DESC, next_attempt_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Running.id())
            .bind(JobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a job completed.
    pub async fn complete(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET status_id = $2, completed_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(JobStatus::Completed.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Return a failed job to Pending with a backoff delay before its next
    /// attempt.
    pub async fn schedule_retry(
        pool: &PgPool,
        id: DbId,
        error: &str,
        delay: Duration,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, last_error = $3, claimed_at = NULL, \
                 next_attempt_at = NOW() + make_interval(secs => $4) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(JobStatus::Pending.id())
        .bind(error)
        .bind(delay.as_secs_f64())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Terminally fail a job after its last attempt. Not retried
    /// automatically; operator intervention is an external concern.
    pub async fn fail_terminal(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, last_error = $3, completed_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(JobStatus::Failed.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Reap jobs stuck in Running past the visibility timeout (worker
    /// crashed before acknowledging) back to Pending for redelivery.
    ///
    /// Returns the number of jobs requeued.
    pub async fn requeue_stuck(
        pool: &PgPool,
        visibility_timeout: Duration,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $1, claimed_at = NULL, next_attempt_at = NOW() \
             WHERE status_id = $2 \
               AND claimed_at < NOW() - make_interval(secs => $3)",
        )
        .bind(JobStatus::Pending.id())
        .bind(JobStatus::Running.id())
        .bind(visibility_timeout.as_secs_f64())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Fetch a job by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count jobs in a given status.
    pub async fn count_by_status(pool: &PgPool, status: JobStatus) -> Result<i64, sqlx::Error> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status_id = $1")
                .bind(status.id())
                .fetch_one(pool)
                .await?;
        Ok(count.unwrap_or(0))
    }
}
