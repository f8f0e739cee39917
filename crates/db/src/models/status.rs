//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` / `*_types` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Campaign lifecycle status.
    CampaignStatus {
        Draft = 1,
        Queued = 2,
        Sending = 3,
        Sent = 4,
        Failed = 5,
    }
}

define_status_enum! {
    /// Subscriber lifecycle status. Once a subscriber reaches Bounced,
    /// Unsubscribed, or Complained, this subsystem never moves it back
    /// to Active.
    SubscriberStatus {
        Active = 1,
        Bounced = 2,
        Unsubscribed = 3,
        Complained = 4,
    }
}

define_status_enum! {
    /// Per-recipient queue item status.
    QueueItemStatus {
        Queued = 1,
        Sending = 2,
        Sent = 3,
        Failed = 4,
    }
}

define_status_enum! {
    /// Durable queue job status.
    JobStatus {
        Pending = 1,
        Running = 2,
        Completed = 3,
        Failed = 4,
    }
}

define_status_enum! {
    /// Audit log event type.
    EmailEventType {
        Delivered = 1,
        Opened = 2,
        Clicked = 3,
        Bounced = 4,
        Unsubscribed = 5,
        SpamComplaint = 6,
        Failed = 7,
    }
}

impl From<mailroom_core::event::ProviderEventKind> for EmailEventType {
    fn from(kind: mailroom_core::event::ProviderEventKind) -> Self {
        use mailroom_core::event::ProviderEventKind;
        match kind {
            ProviderEventKind::Delivered => Self::Delivered,
            ProviderEventKind::Opened => Self::Opened,
            ProviderEventKind::Clicked => Self::Clicked,
            ProviderEventKind::Bounced => Self::Bounced,
            ProviderEventKind::Unsubscribed => Self::Unsubscribed,
            ProviderEventKind::SpamComplaint => Self::SpamComplaint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_status_ids_match_seed_data() {
        assert_eq!(CampaignStatus::Draft.id(), 1);
        assert_eq!(CampaignStatus::Queued.id(), 2);
        assert_eq!(CampaignStatus::Sending.id(), 3);
        assert_eq!(CampaignStatus::Sent.id(), 4);
        assert_eq!(CampaignStatus::Failed.id(), 5);
    }

    #[test]
    fn subscriber_status_ids_match_seed_data() {
        assert_eq!(SubscriberStatus::Active.id(), 1);
        assert_eq!(SubscriberStatus::Bounced.id(), 2);
        assert_eq!(SubscriberStatus::Unsubscribed.id(), 3);
        assert_eq!(SubscriberStatus::Complained.id(), 4);
    }

    #[test]
    fn email_event_type_ids_match_seed_data() {
        assert_eq!(EmailEventType::Delivered.id(), 1);
        assert_eq!(EmailEventType::Opened.id(), 2);
        assert_eq!(EmailEventType::Clicked.id(), 3);
        assert_eq!(EmailEventType::Bounced.id(), 4);
        assert_eq!(EmailEventType::Unsubscribed.id(), 5);
        assert_eq!(EmailEventType::SpamComplaint.id(), 6);
        assert_eq!(EmailEventType::Failed.id(), 7);
    }

    #[test]
    fn provider_event_kind_maps_to_event_type() {
        use mailroom_core::event::ProviderEventKind;
        assert_eq!(
            EmailEventType::from(ProviderEventKind::SpamComplaint).id(),
            EmailEventType::SpamComplaint.id()
        );
    }
}
