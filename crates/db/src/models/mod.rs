//! Row models and status enums.

pub mod campaign;
pub mod email_event;
pub mod engagement;
pub mod job;
pub mod queue_item;
pub mod status;
pub mod subscriber;
pub mod suppression;
pub mod unsubscribe;

pub use campaign::Campaign;
pub use email_event::{EmailEvent, NewEmailEvent};
pub use engagement::EngagementRecord;
pub use job::{Job, NewJob};
pub use queue_item::{NewQueueItem, QueueItem};
pub use status::{
    CampaignStatus, EmailEventType, JobStatus, QueueItemStatus, StatusId, SubscriberStatus,
};
pub use subscriber::Subscriber;
pub use suppression::SuppressionListEntry;
pub use unsubscribe::UnsubscribeRecord;
