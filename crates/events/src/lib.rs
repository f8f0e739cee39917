//! Event reconciliation engine.
//!
//! Consumes delivery-provider webhook events and reconciles them back into
//! campaign and subscriber state:
//!
//! - [`payload`] — the lenient provider webhook payload shape.
//! - [`reconcile`] — [`EventReconciler`], the per-kind dispatch.
//! - [`dedup`] — the [`DedupCache`] contract with Postgres-backed and
//!   in-memory implementations.
//! - [`scorer`] — [`EngagementScorer`], baseline-50 accumulation with the
//!   increment-then-clamp discipline.

pub mod dedup;
pub mod payload;
pub mod reconcile;
pub mod scorer;

pub use dedup::{DedupCache, MemoryDedupCache, PgDedupCache, ENGAGEMENT_DEDUP_TTL};
pub use payload::ProviderEvent;
pub use reconcile::{EventReconciler, ReconcileError};
pub use scorer::EngagementScorer;
