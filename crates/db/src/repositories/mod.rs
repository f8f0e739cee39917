//! Table repositories. One unit struct per table; all methods are static
//! and take a `&PgPool`.

pub mod campaign_repo;
pub mod dedup_repo;
pub mod email_event_repo;
pub mod engagement_repo;
pub mod job_repo;
pub mod queue_item_repo;
pub mod subscriber_repo;
pub mod suppression_repo;
pub mod unsubscribe_repo;

pub use campaign_repo::CampaignRepo;
pub use dedup_repo::DedupRepo;
pub use email_event_repo::EmailEventRepo;
pub use engagement_repo::EngagementRepo;
pub use job_repo::JobRepo;
pub use queue_item_repo::QueueItemRepo;
pub use subscriber_repo::SubscriberRepo;
pub use suppression_repo::SuppressionRepo;
pub use unsubscribe_repo::UnsubscribeRepo;
