//! Consume side of the durable queue: claim, process, acknowledge.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use mailroom_core::backoff::RetryPolicy;
use mailroom_db::models::Job;
use mailroom_db::repositories::JobRepo;
use mailroom_db::DbPool;

/// How long an idle consumer sleeps before polling again.
const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Backoff after a claim query error, to avoid hammering a failing database.
const CLAIM_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Error returned by a job handler.
///
/// The queue does not inspect the failure beyond its display text; both
/// transient and permanent errors flow through the same attempt cap.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct JobError {
    message: String,
}

impl JobError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for JobError {
    fn from(err: sqlx::Error) -> Self {
        Self::new(format!("database error: {err}"))
    }
}

/// Processing seam implemented by queue consumers.
#[async_trait::async_trait]
pub trait JobHandler: Send + Sync {
    /// Process one claimed job. An `Err` re-queues the job with backoff
    /// until its attempt cap, after which it is terminally failed.
    async fn handle(&self, job: &Job) -> Result<(), JobError>;
}

/// Claim and process at most one due job.
///
/// Returns `Ok(true)` when a job was claimed (regardless of handler
/// outcome), `Ok(false)` when nothing was due.
pub async fn process_next(
    pool: &DbPool,
    handler: &dyn JobHandler,
) -> Result<bool, sqlx::Error> {
    let Some(job) = JobRepo::claim_next(pool).await? else {
        return Ok(false);
    };

    match handler.handle(&job).await {
        Ok(()) => {
            JobRepo::complete(pool, job.id).await?;
            tracing::debug!(job_id = job.id, job_type = %job.job_type, "Job completed");
        }
        Err(err) => {
            let policy = RetryPolicy {
                max_attempts: job.max_attempts,
                backoff_base_secs: job.backoff_base_secs,
            };
            if policy.should_retry(job.attempts) {
                let delay = policy.delay_after(job.attempts);
                JobRepo::schedule_retry(pool, job.id, &err.to_string(), delay).await?;
                tracing::warn!(
                    job_id = job.id,
                    job_type = %job.job_type,
                    attempt = job.attempts,
                    retry_in_secs = delay.as_secs(),
                    error = %err,
                    "Job failed, retry scheduled"
                );
            } else {
                JobRepo::fail_terminal(pool, job.id, &err.to_string()).await?;
                tracing::error!(
                    job_id = job.id,
                    job_type = %job.job_type,
                    attempts = job.attempts,
                    error = %err,
                    "Job failed terminally"
                );
            }
        }
    }

    Ok(true)
}

/// Bounded pool of parallel queue consumers.
///
/// Each consumer loops claim → handle → acknowledge. There is no ordering
/// guarantee between jobs; the claim statement guarantees no two consumers
/// hold the same job concurrently.
pub struct WorkerPool {
    pool: DbPool,
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(pool: DbPool, concurrency: usize) -> Self {
        Self {
            pool,
            concurrency: concurrency.max(1),
        }
    }

    /// Run the pool until `cancel` fires, then drain: consumers finish
    /// their in-flight job and exit.
    pub async fn run(&self, handler: Arc<dyn JobHandler>, cancel: CancellationToken) {
        let mut consumers = Vec::with_capacity(self.concurrency);
        for consumer_id in 0..self.concurrency {
            let pool = self.pool.clone();
            let handler = Arc::clone(&handler);
            let cancel = cancel.clone();
            consumers.push(tokio::spawn(async move {
                consumer_loop(consumer_id, pool, handler, cancel).await;
            }));
        }

        for consumer in consumers {
            // A panicked consumer is a bug, but it must not take the others
            // down with it.
            if let Err(err) = consumer.await {
                tracing::error!(error = %err, "Queue consumer task aborted");
            }
        }
    }
}

async fn consumer_loop(
    consumer_id: usize,
    pool: DbPool,
    handler: Arc<dyn JobHandler>,
    cancel: CancellationToken,
) {
    tracing::info!(consumer_id, "Queue consumer started");
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match process_next(&pool, handler.as_ref()).await {
            Ok(true) => {}
            Ok(false) => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
                }
            }
            Err(err) => {
                tracing::error!(consumer_id, error = %err, "Job claim failed");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(CLAIM_ERROR_BACKOFF) => {}
                }
            }
        }
    }
    tracing::info!(consumer_id, "Queue consumer stopped");
}
