//! Enqueue side of the durable queue.

use mailroom_core::backoff::RetryPolicy;
use mailroom_core::types::DbId;
use mailroom_db::models::NewJob;
use mailroom_db::repositories::JobRepo;
use mailroom_db::DbPool;

/// A job submission.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Caller-supplied job id, also the deduplication key.
    pub id: DbId,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub retry: RetryPolicy,
}

impl From<&JobSpec> for NewJob {
    fn from(spec: &JobSpec) -> Self {
        NewJob {
            id: spec.id,
            job_type: spec.job_type.clone(),
            payload: spec.payload.clone(),
            priority: spec.priority,
            max_attempts: spec.retry.max_attempts,
            backoff_base_secs: spec.retry.backoff_base_secs,
        }
    }
}

/// Handle for submitting jobs to the durable queue.
#[derive(Clone)]
pub struct JobQueue {
    pool: DbPool,
}

impl JobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Submit one job. Returns `false` when the id was already enqueued.
    pub async fn enqueue(&self, spec: &JobSpec) -> Result<bool, sqlx::Error> {
        let inserted = JobRepo::insert(&self.pool, &NewJob::from(spec)).await?;
        if !inserted {
            tracing::debug!(job_id = spec.id, job_type = %spec.job_type, "Job already enqueued");
        }
        Ok(inserted)
    }

    /// Submit a batch of jobs in one transaction. Duplicate ids are skipped.
    /// Returns the number actually inserted.
    pub async fn enqueue_batch(&self, specs: &[JobSpec]) -> Result<u64, sqlx::Error> {
        let jobs: Vec<NewJob> = specs.iter().map(NewJob::from).collect();
        JobRepo::insert_batch(&self.pool, &jobs).await
    }
}
