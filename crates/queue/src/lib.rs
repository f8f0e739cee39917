//! Durable, priority-ordered, at-least-once job queue.
//!
//! Jobs live in the `jobs` table; the caller supplies each job's id, so
//! enqueueing the same id twice is a no-op. Claiming is a single atomic
//! `FOR UPDATE SKIP LOCKED` update, which guarantees a job is delivered to
//! at most one worker at a time. A handler error sends the job back to
//! Pending with exponential backoff until its attempt cap, then terminally
//! fails it.
//!
//! - [`JobQueue`] — enqueue / enqueue-batch.
//! - [`JobHandler`] — the processing seam implemented by consumers.
//! - [`WorkerPool`] — bounded pool of claim-process-acknowledge loops.

pub mod queue;
pub mod worker;

pub use queue::{JobQueue, JobSpec};
pub use worker::{process_next, JobError, JobHandler, WorkerPool};
