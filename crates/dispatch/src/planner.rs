//! Campaign fan-out: one queue item and one send job per eligible recipient.
//!
//! Every step is independently idempotent so a partial re-run after a crash
//! never double-sends: queue items are keyed on (campaign, subscriber), and
//! the queue deduplicates jobs by the queue item id. Per-recipient failures
//! are isolated (logged, counted, skipped) while a batch-level failure
//! marks the campaign Failed and propagates.

use mailroom_core::backoff::RetryPolicy;
use mailroom_core::error::CoreError;
use mailroom_core::types::DbId;
use mailroom_db::models::{Campaign, NewQueueItem, Subscriber};
use mailroom_db::repositories::{CampaignRepo, QueueItemRepo, SubscriberRepo, SuppressionRepo};
use mailroom_db::DbPool;
use mailroom_queue::{JobQueue, JobSpec};

use crate::sender::{SendJobPayload, JOB_TYPE_CAMPAIGN_SEND};

/// Queue priority for campaign send jobs.
pub const DEFAULT_SEND_PRIORITY: i32 = 0;

/// Planner knobs: job priority and the per-job retry policy.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub priority: i32,
    pub retry: RetryPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            priority: DEFAULT_SEND_PRIORITY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Per-campaign planning result: a fold over per-recipient outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlanOutcome {
    /// Recipients with a queue item and a submitted job.
    pub queued: usize,
    /// Recipients skipped by the suppression gate.
    pub skipped_suppressed: usize,
    /// Recipients whose planning failed (isolated, batch continued).
    pub failed: usize,
}

/// Error type for campaign planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Expands one campaign into per-recipient work.
pub struct DispatchPlanner;

impl DispatchPlanner {
    /// Plan a campaign send.
    ///
    /// A missing campaign aborts with [`CoreError::NotFound`] and leaves all
    /// state untouched. Any other batch-level failure marks the campaign
    /// Failed and propagates the error for surfacing.
    pub async fn plan(
        pool: &DbPool,
        queue: &JobQueue,
        config: &DispatchConfig,
        campaign_id: DbId,
    ) -> Result<PlanOutcome, PlanError> {
        let campaign = CampaignRepo::find_by_id(pool, campaign_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Campaign",
                id: campaign_id,
            })?;

        match Self::plan_batch(pool, queue, config, &campaign).await {
            Ok(outcome) => {
                tracing::info!(
                    campaign_id,
                    queued = outcome.queued,
                    skipped_suppressed = outcome.skipped_suppressed,
                    failed = outcome.failed,
                    "Campaign planned"
                );
                Ok(outcome)
            }
            Err(err) => {
                tracing::error!(campaign_id, error = %err, "Campaign planning aborted");
                if let Err(mark_err) = CampaignRepo::mark_failed(pool, campaign_id).await {
                    tracing::error!(
                        campaign_id,
                        error = %mark_err,
                        "Failed to mark campaign as failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// Fan out over the eligible audience, then transition the campaign to
    /// Sending with the count actually queued.
    async fn plan_batch(
        pool: &DbPool,
        queue: &JobQueue,
        config: &DispatchConfig,
        campaign: &Campaign,
    ) -> Result<PlanOutcome, PlanError> {
        let subscribers = SubscriberRepo::list_active(pool, campaign.organization_id).await?;

        let mut outcome = PlanOutcome::default();
        for subscriber in &subscribers {
            match Self::plan_one(pool, queue, config, campaign, subscriber).await {
                Ok(true) => outcome.queued += 1,
                Ok(false) => {
                    outcome.skipped_suppressed += 1;
                    tracing::info!(
                        campaign_id = campaign.id,
                        subscriber_id = subscriber.id,
                        "Recipient suppressed, skipping"
                    );
                }
                Err(err) => {
                    outcome.failed += 1;
                    tracing::warn!(
                        campaign_id = campaign.id,
                        subscriber_id = subscriber.id,
                        error = %err,
                        "Recipient planning failed, continuing with the batch"
                    );
                }
            }
        }

        CampaignRepo::mark_sending(pool, campaign.id, outcome.queued as i64).await?;
        Ok(outcome)
    }

    /// Plan a single recipient. Returns `Ok(false)` when suppressed.
    async fn plan_one(
        pool: &DbPool,
        queue: &JobQueue,
        config: &DispatchConfig,
        campaign: &Campaign,
        subscriber: &Subscriber,
    ) -> Result<bool, sqlx::Error> {
        if SuppressionRepo::is_suppressed(pool, campaign.organization_id, &subscriber.email)
            .await?
        {
            return Ok(false);
        }

        let item = QueueItemRepo::create_or_reuse(
            pool,
            &NewQueueItem {
                campaign_id: campaign.id,
                subscriber_id: subscriber.id,
                subject: campaign.subject.clone(),
                html_body: campaign.html_body.clone(),
                field_map: build_field_map(campaign, subscriber),
            },
        )
        .await?;

        let payload = SendJobPayload {
            queue_item_id: item.id,
            campaign_id: campaign.id,
            subscriber_id: subscriber.id,
        };
        queue
            .enqueue(&JobSpec {
                id: item.id,
                job_type: JOB_TYPE_CAMPAIGN_SEND.to_string(),
                payload: serde_json::to_value(&payload)
                    .expect("send payload serialization is infallible"),
                priority: config.priority,
                retry: config.retry,
            })
            .await?;

        Ok(true)
    }
}

/// Assemble the personalization field map from subscriber and campaign
/// attributes. Scalar subscriber attributes are flattened in alongside the
/// built-in fields; the built-ins win on a name clash.
pub fn build_field_map(campaign: &Campaign, subscriber: &Subscriber) -> serde_json::Value {
    let mut fields = serde_json::Map::new();

    if let Some(attrs) = subscriber.attributes.as_object() {
        for (key, value) in attrs {
            let rendered = match value {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            };
            if let Some(rendered) = rendered {
                fields.insert(key.clone(), serde_json::Value::String(rendered));
            }
        }
    }

    fields.insert(
        "firstname".to_string(),
        serde_json::Value::String(subscriber.first_name.clone().unwrap_or_default()),
    );
    fields.insert(
        "lastname".to_string(),
        serde_json::Value::String(subscriber.last_name.clone().unwrap_or_default()),
    );
    fields.insert(
        "email".to_string(),
        serde_json::Value::String(subscriber.email.clone()),
    );
    fields.insert(
        "campaignname".to_string(),
        serde_json::Value::String(campaign.name.clone()),
    );

    serde_json::Value::Object(fields)
}
