//! The send worker: queue consumer that personalizes and submits one
//! message per job.
//!
//! The three writes on each outcome path (queue-item update, audit event
//! append, counter increment) are deliberately not transactional: counters
//! are advisory aggregates while `email_events` is the authoritative audit
//! trail, so partial application on a crash is tolerated.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

use mailroom_core::personalize;
use mailroom_core::types::DbId;
use mailroom_db::models::{EmailEventType, Job, NewEmailEvent};
use mailroom_db::repositories::{CampaignRepo, EmailEventRepo, QueueItemRepo, SubscriberRepo};
use mailroom_db::DbPool;
use mailroom_queue::{JobError, JobHandler};

use crate::provider::{CorrelationMetadata, EmailProvider, OutboundEmail};

/// Job type tag for campaign send jobs.
pub const JOB_TYPE_CAMPAIGN_SEND: &str = "campaign_send";

/// Payload carried by a campaign send job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendJobPayload {
    pub queue_item_id: DbId,
    pub campaign_id: DbId,
    pub subscriber_id: DbId,
}

/// Send worker configuration.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Base URL for the tracking beacon, click redirector, and unsubscribe
    /// pages.
    pub tracking_base: Url,
}

/// Queue handler that delivers one queue item per job.
pub struct SendJobHandler {
    pool: DbPool,
    provider: Arc<dyn EmailProvider>,
    config: SenderConfig,
}

impl SendJobHandler {
    pub fn new(pool: DbPool, provider: Arc<dyn EmailProvider>, config: SenderConfig) -> Self {
        Self {
            pool,
            provider,
            config,
        }
    }
}

#[async_trait::async_trait]
impl JobHandler for SendJobHandler {
    async fn handle(&self, job: &Job) -> Result<(), JobError> {
        let payload: SendJobPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| JobError::new(format!("invalid send payload: {e}")))?;

        let item = QueueItemRepo::find_by_id(&self.pool, payload.queue_item_id)
            .await?
            .ok_or_else(|| {
                JobError::new(format!("queue item {} not found", payload.queue_item_id))
            })?;
        let campaign = CampaignRepo::find_by_id(&self.pool, item.campaign_id)
            .await?
            .ok_or_else(|| JobError::new(format!("campaign {} not found", item.campaign_id)))?;
        let subscriber = SubscriberRepo::find_by_id(&self.pool, item.subscriber_id)
            .await?
            .ok_or_else(|| {
                JobError::new(format!("subscriber {} not found", item.subscriber_id))
            })?;

        QueueItemRepo::mark_sending(&self.pool, item.id).await?;

        let fields = field_map_to_strings(&item.field_map);
        let subject = personalize::render(&item.subject, &fields);
        let html = personalize::render(&item.html_body, &fields);
        let html = personalize::rewrite_links(
            &html,
            &self.config.tracking_base,
            item.id,
            subscriber.id,
            campaign.utm_params.as_ref(),
        );
        let html = personalize::inject_tracking_pixel(
            &html,
            &personalize::beacon_url(&self.config.tracking_base, item.id, subscriber.id),
        );
        let html = personalize::append_unsubscribe_footer(
            &html,
            &personalize::unsubscribe_url(&self.config.tracking_base, subscriber.id, campaign.id),
        );

        let outbound = OutboundEmail {
            to: subscriber.email.clone(),
            from_name: campaign.from_name.clone(),
            from_address: campaign.from_address.clone(),
            subject,
            html,
            correlation: CorrelationMetadata {
                queue_item_id: item.id,
                campaign_id: campaign.id,
                subscriber_id: subscriber.id,
            },
            categories: vec![campaign.name.clone()],
        };

        match self.provider.send(&outbound).await {
            Ok(ack) => {
                QueueItemRepo::mark_sent(&self.pool, item.id, &ack.provider_message_id).await?;
                // Submission success, not provider-confirmed delivery; the
                // confirmed event arrives later via the webhook.
                EmailEventRepo::insert(
                    &self.pool,
                    &NewEmailEvent {
                        campaign_id: Some(campaign.id),
                        subscriber_id: Some(subscriber.id),
                        queue_item_id: Some(item.id),
                        provider_message_id: Some(ack.provider_message_id.clone()),
                        event_type: EmailEventType::Delivered,
                        occurred_at: Utc::now(),
                        metadata: serde_json::json!({"attempt": job.attempts}),
                    },
                )
                .await?;
                CampaignRepo::increment_sent(&self.pool, campaign.id).await?;
                tracing::info!(
                    job_id = job.id,
                    campaign_id = campaign.id,
                    subscriber_id = subscriber.id,
                    provider_message_id = %ack.provider_message_id,
                    "Message submitted"
                );
                Ok(())
            }
            Err(err) => {
                let error_text = err.to_string();
                tracing::warn!(
                    job_id = job.id,
                    campaign_id = campaign.id,
                    subscriber_id = subscriber.id,
                    attempt = job.attempts,
                    permanent = err.is_permanent(),
                    error = %error_text,
                    "Provider send failed"
                );
                QueueItemRepo::mark_failed(&self.pool, item.id, &error_text).await?;
                EmailEventRepo::insert(
                    &self.pool,
                    &NewEmailEvent {
                        campaign_id: Some(campaign.id),
                        subscriber_id: Some(subscriber.id),
                        queue_item_id: Some(item.id),
                        provider_message_id: None,
                        event_type: EmailEventType::Failed,
                        occurred_at: Utc::now(),
                        metadata: serde_json::json!({
                            "attempt": job.attempts,
                            "error": error_text,
                        }),
                    },
                )
                .await?;
                CampaignRepo::increment_failed(&self.pool, campaign.id).await?;
                // Re-raise so the queue's retry policy decides what happens.
                Err(JobError::new(error_text))
            }
        }
    }
}

/// Flatten a JSONB field map into the string map the personalizer takes.
fn field_map_to_strings(field_map: &serde_json::Value) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    if let Some(map) = field_map.as_object() {
        for (key, value) in map {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Null => String::new(),
                _ => continue,
            };
            fields.insert(key.clone(), rendered);
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_map_flattens_scalars_and_skips_nested_values() {
        let map = serde_json::json!({
            "firstname": "Ana",
            "age": 30,
            "vip": true,
            "missing": null,
            "nested": {"ignored": true},
        });
        let fields = field_map_to_strings(&map);
        assert_eq!(fields.get("firstname").map(String::as_str), Some("Ana"));
        assert_eq!(fields.get("age").map(String::as_str), Some("30"));
        assert_eq!(fields.get("vip").map(String::as_str), Some("true"));
        assert_eq!(fields.get("missing").map(String::as_str), Some(""));
        assert!(!fields.contains_key("nested"));
    }

    #[test]
    fn send_payload_round_trips_through_json() {
        let payload = SendJobPayload {
            queue_item_id: 1,
            campaign_id: 2,
            subscriber_id: 3,
        };
        let value = serde_json::to_value(&payload).unwrap();
        let back: SendJobPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back.queue_item_id, 1);
        assert_eq!(back.campaign_id, 2);
        assert_eq!(back.subscriber_id, 3);
    }
}
