//! Campaign dispatch pipeline: planner, send worker, and email providers.
//!
//! - [`planner`] — fans a campaign out into per-recipient queue items and
//!   submits them to the durable queue.
//! - [`sender`] — the queue consumer that personalizes and submits one
//!   message per job.
//! - [`provider`] — the `send(message) -> provider message id` seam, with
//!   SMTP ([`smtp`]) and HTTP-API ([`http_api`]) implementations and a
//!   scriptable [`testing::MockProvider`].

pub mod http_api;
pub mod planner;
pub mod provider;
pub mod sender;
pub mod smtp;
pub mod testing;

pub use planner::{DispatchConfig, DispatchPlanner, PlanError, PlanOutcome};
pub use provider::{
    CorrelationMetadata, EmailProvider, OutboundEmail, ProviderError, ProviderResponse,
};
pub use sender::{SendJobHandler, SenderConfig, JOB_TYPE_CAMPAIGN_SEND};
