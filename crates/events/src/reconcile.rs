//! Idempotent ingestion of delivery-provider webhook events.
//!
//! Each event is processed independently: the reconciler resolves the
//! affected subscriber and campaign, always appends an audit event, and then
//! applies kind-specific state: counter increments, subscriber status
//! transitions, suppression upserts, and engagement scoring. Unrecognized
//! event kinds are logged and ignored so provider additions never break
//! ingestion.
//!
//! There is no ordering guarantee against the send pipeline (a delivered
//! or open event may arrive before the local queue item is marked Sent),
//! so correlation is by subscriber/campaign id, never by queue item status.

use std::sync::Arc;

use mailroom_core::bounce::BounceClass;
use mailroom_core::engagement::ScoreDelta;
use mailroom_core::event::ProviderEventKind;
use mailroom_db::models::{Campaign, EmailEventType, NewEmailEvent, Subscriber};
use mailroom_db::repositories::{
    CampaignRepo, EmailEventRepo, SubscriberRepo, SuppressionRepo, UnsubscribeRepo,
};
use mailroom_db::DbPool;

use crate::dedup::{engagement_key, CacheError, DedupCache, ENGAGEMENT_DEDUP_TTL};
use crate::payload::ProviderEvent;
use crate::scorer::EngagementScorer;

/// Error type for event reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Reconciles provider webhook events into campaign/subscriber state.
pub struct EventReconciler {
    pool: DbPool,
    cache: Arc<dyn DedupCache>,
    scorer: EngagementScorer,
}

impl EventReconciler {
    pub fn new(pool: DbPool, cache: Arc<dyn DedupCache>) -> Self {
        let scorer = EngagementScorer::new(pool.clone(), Arc::clone(&cache));
        Self {
            pool,
            cache,
            scorer,
        }
    }

    /// Process one webhook event.
    pub async fn process_event(&self, event: &ProviderEvent) -> Result<(), ReconcileError> {
        let Some(kind) = event.kind() else {
            tracing::warn!(tag = %event.event, "Unrecognized provider event kind, ignoring");
            return Ok(());
        };

        let (campaign, subscriber) = self.resolve(event).await?;

        match kind {
            ProviderEventKind::Delivered => {
                self.on_delivered(event, campaign.as_ref(), subscriber.as_ref()).await
            }
            ProviderEventKind::Opened => {
                self.on_opened(event, campaign.as_ref(), subscriber.as_ref()).await
            }
            ProviderEventKind::Clicked => {
                self.on_clicked(event, campaign.as_ref(), subscriber.as_ref()).await
            }
            ProviderEventKind::Bounced => {
                self.on_bounced(event, campaign.as_ref(), subscriber.as_ref()).await
            }
            ProviderEventKind::Unsubscribed => {
                self.on_unsubscribed(event, campaign.as_ref(), subscriber.as_ref()).await
            }
            ProviderEventKind::SpamComplaint => {
                self.on_spam_complaint(event, campaign.as_ref(), subscriber.as_ref()).await
            }
        }
    }

    /// Resolve the campaign via correlation metadata and the subscriber by
    /// address within the campaign's organization, falling back to the
    /// correlation subscriber id; provider payloads are not guaranteed to
    /// carry either.
    async fn resolve(
        &self,
        event: &ProviderEvent,
    ) -> Result<(Option<Campaign>, Option<Subscriber>), sqlx::Error> {
        let campaign = match event.campaign_id {
            Some(id) => CampaignRepo::find_by_id(&self.pool, id).await?,
            None => None,
        };

        let mut subscriber = None;
        if let (Some(campaign), Some(email)) = (&campaign, &event.email) {
            subscriber =
                SubscriberRepo::find_by_email(&self.pool, campaign.organization_id, email).await?;
        }
        if subscriber.is_none() {
            if let Some(id) = event.subscriber_id {
                subscriber = SubscriberRepo::find_by_id(&self.pool, id).await?;
            }
        }

        Ok((campaign, subscriber))
    }

    /// Append the audit event. Always runs, whatever the dedup or
    /// resolution outcome.
    async fn append_event(
        &self,
        event: &ProviderEvent,
        kind: ProviderEventKind,
        campaign: Option<&Campaign>,
        subscriber: Option<&Subscriber>,
        metadata: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        EmailEventRepo::insert(
            &self.pool,
            &NewEmailEvent {
                campaign_id: campaign.map(|c| c.id),
                subscriber_id: subscriber.map(|s| s.id),
                queue_item_id: event.queue_item_id,
                provider_message_id: event.provider_message_id.clone(),
                event_type: EmailEventType::from(kind),
                occurred_at: event.occurred_at(),
                metadata,
            },
        )
        .await?;
        Ok(())
    }

    /// Provider-confirmed delivery. No dedup: duplicate notifications are
    /// harmless extra increments.
    async fn on_delivered(
        &self,
        event: &ProviderEvent,
        campaign: Option<&Campaign>,
        subscriber: Option<&Subscriber>,
    ) -> Result<(), ReconcileError> {
        self.append_event(
            event,
            ProviderEventKind::Delivered,
            campaign,
            subscriber,
            serde_json::json!({}),
        )
        .await?;
        if let Some(campaign) = campaign {
            CampaignRepo::increment_delivered(&self.pool, campaign.id).await?;
        }
        Ok(())
    }

    /// Open tracking: `open_count` counts every open, `unique_open_count`
    /// and the engagement scorer fire only for the first open per
    /// (subscriber, campaign) within the dedup window.
    async fn on_opened(
        &self,
        event: &ProviderEvent,
        campaign: Option<&Campaign>,
        subscriber: Option<&Subscriber>,
    ) -> Result<(), ReconcileError> {
        let unique = match (subscriber, campaign) {
            (Some(subscriber), Some(campaign)) => {
                self.cache
                    .set_if_absent(
                        &engagement_key(subscriber.id, campaign.id, "open"),
                        ENGAGEMENT_DEDUP_TTL,
                    )
                    .await?
            }
            // Uniqueness needs both ids; an unresolvable open only counts
            // toward the raw total.
            _ => false,
        };

        self.append_event(
            event,
            ProviderEventKind::Opened,
            campaign,
            subscriber,
            serde_json::json!({"unique": unique}),
        )
        .await?;

        if let Some(campaign) = campaign {
            CampaignRepo::increment_opens(&self.pool, campaign.id, unique).await?;
        }
        if unique {
            if let Some(subscriber) = subscriber {
                self.scorer.apply(subscriber.id, ScoreDelta::Open).await?;
            }
        }
        Ok(())
    }

    /// Click tracking: `click_count` and the scorer fire on every click,
    /// since repeat clicks keep boosting engagement. The dedup key is still
    /// set for parity with opens, reserving unique-click accounting.
    async fn on_clicked(
        &self,
        event: &ProviderEvent,
        campaign: Option<&Campaign>,
        subscriber: Option<&Subscriber>,
    ) -> Result<(), ReconcileError> {
        if let (Some(subscriber), Some(campaign)) = (subscriber, campaign) {
            self.cache
                .set_if_absent(
                    &engagement_key(subscriber.id, campaign.id, "click"),
                    ENGAGEMENT_DEDUP_TTL,
                )
                .await?;
        }

        self.append_event(
            event,
            ProviderEventKind::Clicked,
            campaign,
            subscriber,
            serde_json::json!({"url": event.url}),
        )
        .await?;

        if let Some(campaign) = campaign {
            CampaignRepo::increment_clicks(&self.pool, campaign.id).await?;
        }
        if let Some(subscriber) = subscriber {
            self.scorer.apply(subscriber.id, ScoreDelta::Click).await?;
        }
        Ok(())
    }

    /// Bounce handling: only hard bounces change subscriber state and feed
    /// the suppression list.
    async fn on_bounced(
        &self,
        event: &ProviderEvent,
        campaign: Option<&Campaign>,
        subscriber: Option<&Subscriber>,
    ) -> Result<(), ReconcileError> {
        let class = BounceClass::from_provider(event.bounce_type.as_deref());
        let reason = event.reason.clone().unwrap_or_else(|| "bounce".to_string());

        self.append_event(
            event,
            ProviderEventKind::Bounced,
            campaign,
            subscriber,
            serde_json::json!({
                "reason": reason,
                "classification": if class.is_hard() { "hard" } else { "soft" },
            }),
        )
        .await?;

        if !class.is_hard() {
            tracing::info!(
                campaign_id = campaign.map(|c| c.id),
                subscriber_id = subscriber.map(|s| s.id),
                "Soft bounce logged, subscriber status unchanged"
            );
            return Ok(());
        }

        match subscriber {
            Some(subscriber) => {
                SubscriberRepo::mark_bounced(&self.pool, subscriber.id).await?;
                SuppressionRepo::upsert(
                    &self.pool,
                    subscriber.organization_id,
                    &subscriber.email,
                    &reason,
                )
                .await?;
                tracing::info!(
                    subscriber_id = subscriber.id,
                    campaign_id = campaign.map(|c| c.id),
                    "Hard bounce: subscriber suppressed"
                );
            }
            None => {
                tracing::warn!(
                    email = event.email.as_deref(),
                    campaign_id = campaign.map(|c| c.id),
                    "Hard bounce for unresolvable subscriber"
                );
            }
        }
        Ok(())
    }

    async fn on_unsubscribed(
        &self,
        event: &ProviderEvent,
        campaign: Option<&Campaign>,
        subscriber: Option<&Subscriber>,
    ) -> Result<(), ReconcileError> {
        self.append_event(
            event,
            ProviderEventKind::Unsubscribed,
            campaign,
            subscriber,
            serde_json::json!({}),
        )
        .await?;

        if let Some(subscriber) = subscriber {
            SubscriberRepo::mark_unsubscribed(&self.pool, subscriber.id).await?;
            UnsubscribeRepo::insert(
                &self.pool,
                subscriber.id,
                campaign.map(|c| c.id),
                event.occurred_at(),
            )
            .await?;
            self.scorer.apply(subscriber.id, ScoreDelta::Unsubscribe).await?;
        } else {
            tracing::warn!(
                email = event.email.as_deref(),
                "Unsubscribe for unresolvable subscriber"
            );
        }
        Ok(())
    }

    /// Spam complaint: status Complained, unconditional suppression, and an
    /// engagement hard reset to zero.
    async fn on_spam_complaint(
        &self,
        event: &ProviderEvent,
        campaign: Option<&Campaign>,
        subscriber: Option<&Subscriber>,
    ) -> Result<(), ReconcileError> {
        self.append_event(
            event,
            ProviderEventKind::SpamComplaint,
            campaign,
            subscriber,
            serde_json::json!({}),
        )
        .await?;

        if let Some(subscriber) = subscriber {
            SubscriberRepo::mark_complained(&self.pool, subscriber.id).await?;
            SuppressionRepo::upsert(
                &self.pool,
                subscriber.organization_id,
                &subscriber.email,
                "spam complaint",
            )
            .await?;
            self.scorer.apply(subscriber.id, ScoreDelta::Spam).await?;
        } else {
            tracing::warn!(
                email = event.email.as_deref(),
                "Spam complaint for unresolvable subscriber"
            );
        }
        Ok(())
    }
}
