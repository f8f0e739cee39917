//! End-to-end dispatch pipeline tests: plan a campaign, drive the queue
//! with a mock provider, and verify status transitions, the audit log, and
//! the aggregate counters.

use std::sync::Arc;

use assert_matches::assert_matches;
use sqlx::PgPool;
use url::Url;

use mailroom_core::backoff::RetryPolicy;
use mailroom_core::error::CoreError;
use mailroom_db::models::{
    CampaignStatus, EmailEventType, JobStatus, QueueItemStatus, SubscriberStatus,
};
use mailroom_db::repositories::{
    CampaignRepo, EmailEventRepo, JobRepo, QueueItemRepo, SuppressionRepo,
};
use mailroom_dispatch::planner::{DispatchConfig, DispatchPlanner, PlanError};
use mailroom_dispatch::sender::{SendJobHandler, SenderConfig};
use mailroom_dispatch::testing::MockProvider;
use mailroom_dispatch::ProviderError;
use mailroom_queue::{process_next, JobQueue};

async fn seed_org(pool: &PgPool) -> i64 {
    sqlx::query_scalar("INSERT INTO organizations (name) VALUES ('acme') RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_campaign(pool: &PgPool, org: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO campaigns \
            (organization_id, name, subject, html_body, from_name, from_address, \
             utm_params, status_id) \
         VALUES ($1, 'Spring Launch', 'Hi {{firstName}}', \
                 '<html><body><p>Hi {{firstName}}</p>\
                  <a href=\"https://acme.test/offer\">Offer</a></body></html>', \
                 'Acme', 'news@acme.test', \
                 '{\"utm_source\": \"newsletter\"}'::jsonb, $2) \
         RETURNING id",
    )
    .bind(org)
    .bind(CampaignStatus::Queued.id())
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_subscriber(pool: &PgPool, org: i64, email: &str, first_name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO subscribers (organization_id, email, first_name, status_id) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(org)
    .bind(email)
    .bind(first_name)
    .bind(SubscriberStatus::Active.id())
    .fetch_one(pool)
    .await
    .unwrap()
}

fn sender_config() -> SenderConfig {
    SenderConfig {
        tracking_base: Url::parse("https://track.acme.test").unwrap(),
    }
}

/// Zero backoff so retried jobs are immediately due in tests.
fn fast_retry_config() -> DispatchConfig {
    DispatchConfig {
        priority: 0,
        retry: RetryPolicy {
            max_attempts: 3,
            backoff_base_secs: 0,
        },
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn plan_queues_each_active_subscriber_once(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    seed_subscriber(&pool, org, "a@acme.test", "Ana").await;
    seed_subscriber(&pool, org, "b@acme.test", "Bo").await;

    let queue = JobQueue::new(pool.clone());
    let outcome = DispatchPlanner::plan(&pool, &queue, &DispatchConfig::default(), campaign)
        .await
        .unwrap();

    assert_eq!(outcome.queued, 2);
    assert_eq!(outcome.skipped_suppressed, 0);
    assert_eq!(outcome.failed, 0);

    let row = CampaignRepo::find_by_id(&pool, campaign).await.unwrap().unwrap();
    assert_eq!(row.status_id, CampaignStatus::Sending.id());
    assert_eq!(row.total_recipients, 2);
    assert!(row.send_started_at.is_some());

    assert_eq!(JobRepo::count_by_status(&pool, JobStatus::Pending).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn replanning_never_duplicates_queue_items_or_jobs(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    seed_subscriber(&pool, org, "a@acme.test", "Ana").await;

    let queue = JobQueue::new(pool.clone());
    DispatchPlanner::plan(&pool, &queue, &DispatchConfig::default(), campaign)
        .await
        .unwrap();
    // Force the campaign back to Queued to simulate a crashed re-run.
    sqlx::query("UPDATE campaigns SET status_id = $2 WHERE id = $1")
        .bind(campaign)
        .bind(CampaignStatus::Queued.id())
        .execute(&pool)
        .await
        .unwrap();
    DispatchPlanner::plan(&pool, &queue, &DispatchConfig::default(), campaign)
        .await
        .unwrap();

    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    let jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(items, 1);
    assert_eq!(jobs, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn suppressed_recipients_are_skipped_without_queue_items(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    seed_subscriber(&pool, org, "a@acme.test", "Ana").await;
    let suppressed = seed_subscriber(&pool, org, "blocked@acme.test", "Bo").await;
    SuppressionRepo::upsert(&pool, org, "blocked@acme.test", "hard bounce")
        .await
        .unwrap();

    let queue = JobQueue::new(pool.clone());
    let outcome = DispatchPlanner::plan(&pool, &queue, &DispatchConfig::default(), campaign)
        .await
        .unwrap();

    assert_eq!(outcome.queued, 1);
    assert_eq!(outcome.skipped_suppressed, 1);

    let suppressed_items: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM queue_items WHERE subscriber_id = $1")
            .bind(suppressed)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(suppressed_items, 0, "no queue item may exist for a suppressed address");

    let row = CampaignRepo::find_by_id(&pool, campaign).await.unwrap().unwrap();
    assert_eq!(row.total_recipients, 1, "only the count actually queued");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn planning_a_missing_campaign_aborts_cleanly(pool: PgPool) {
    let queue = JobQueue::new(pool.clone());
    let err = DispatchPlanner::plan(&pool, &queue, &DispatchConfig::default(), 999)
        .await
        .unwrap_err();
    assert_matches!(err, PlanError::Core(CoreError::NotFound { entity: "Campaign", .. }));

    let jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(jobs, 0, "no partial state after a not-found abort");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn successful_send_personalizes_and_records_everything(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    let subscriber = seed_subscriber(&pool, org, "ana@acme.test", "Ana").await;

    let queue = JobQueue::new(pool.clone());
    DispatchPlanner::plan(&pool, &queue, &DispatchConfig::default(), campaign)
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::new());
    let handler = SendJobHandler::new(pool.clone(), provider.clone(), sender_config());
    assert!(process_next(&pool, &handler).await.unwrap());

    // Personalized content went to the provider.
    let sent = provider.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ana@acme.test");
    assert_eq!(sent[0].subject, "Hi Ana");
    assert!(sent[0].html.contains("Hi Ana"));
    assert!(sent[0].html.contains("track.acme.test/t/open/"), "tracking pixel injected");
    assert!(sent[0].html.contains("track.acme.test/t/click"), "links rewritten");
    assert!(sent[0].html.contains("utm_source=newsletter"), "campaign UTM params carried");
    assert!(sent[0].html.contains("Unsubscribe"), "unsubscribe footer appended");
    assert_eq!(sent[0].correlation.campaign_id, campaign);
    assert_eq!(sent[0].correlation.subscriber_id, subscriber);

    // Queue item, audit log, and counters reflect the submission.
    let item = QueueItemRepo::find_by_id(&pool, sent[0].correlation.queue_item_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.status_id, QueueItemStatus::Sent.id());
    assert_eq!(item.provider_message_id.as_deref(), Some("mock-1"));

    let delivered = EmailEventRepo::count_for_campaign(&pool, campaign, EmailEventType::Delivered)
        .await
        .unwrap();
    assert_eq!(delivered, 1);

    let row = CampaignRepo::find_by_id(&pool, campaign).await.unwrap().unwrap();
    assert_eq!(row.sent_count, 1);
    assert_eq!(row.failed_count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn three_failures_exhaust_the_job_and_audit_each_attempt(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    seed_subscriber(&pool, org, "ana@acme.test", "Ana").await;

    let queue = JobQueue::new(pool.clone());
    DispatchPlanner::plan(&pool, &queue, &fast_retry_config(), campaign)
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::new());
    for _ in 0..3 {
        provider.queue_failure(ProviderError::Transport("connection reset".to_string()));
    }
    let handler = SendJobHandler::new(pool.clone(), provider.clone(), sender_config());

    for _ in 0..3 {
        assert!(process_next(&pool, &handler).await.unwrap());
    }
    assert!(!process_next(&pool, &handler).await.unwrap(), "job is terminally failed");

    assert_eq!(provider.sent_count(), 3);

    let item_id: i64 = sqlx::query_scalar("SELECT id FROM queue_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    let item = QueueItemRepo::find_by_id(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(item.status_id, QueueItemStatus::Failed.id());
    assert_eq!(item.retry_count, 3);
    assert!(item.last_error.as_deref().unwrap().contains("connection reset"));

    let failed_events = EmailEventRepo::count_for_campaign(&pool, campaign, EmailEventType::Failed)
        .await
        .unwrap();
    assert_eq!(failed_events, 3);

    let row = CampaignRepo::find_by_id(&pool, campaign).await.unwrap().unwrap();
    assert_eq!(row.failed_count, 3);
    assert_eq!(row.sent_count, 0);

    let job = JobRepo::find_by_id(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(job.status_id, JobStatus::Failed.id());
    assert_eq!(job.attempts, 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn transient_failure_then_success_completes_the_item(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    seed_subscriber(&pool, org, "ana@acme.test", "Ana").await;

    let queue = JobQueue::new(pool.clone());
    DispatchPlanner::plan(&pool, &queue, &fast_retry_config(), campaign)
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::new());
    provider.queue_failure(ProviderError::Transport("rate limited".to_string()));
    let handler = SendJobHandler::new(pool.clone(), provider.clone(), sender_config());

    assert!(process_next(&pool, &handler).await.unwrap());
    assert!(process_next(&pool, &handler).await.unwrap());

    let item_id: i64 = sqlx::query_scalar("SELECT id FROM queue_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    let item = QueueItemRepo::find_by_id(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(item.status_id, QueueItemStatus::Sent.id());
    assert_eq!(item.retry_count, 1, "one failed attempt before success");

    let row = CampaignRepo::find_by_id(&pool, campaign).await.unwrap().unwrap();
    assert_eq!(row.sent_count, 1);
    assert_eq!(row.failed_count, 1, "counters are monotone; the failure stays counted");
}
