//! Reconciler behavior tests: dedup discipline, counters, subscriber state
//! transitions, suppression, and engagement scoring.

use std::sync::Arc;

use sqlx::PgPool;

use mailroom_db::models::{CampaignStatus, EmailEventType, SubscriberStatus};
use mailroom_db::repositories::{
    CampaignRepo, EmailEventRepo, EngagementRepo, SubscriberRepo, SuppressionRepo,
};
use mailroom_events::{EventReconciler, MemoryDedupCache, PgDedupCache, ProviderEvent};

async fn seed_org(pool: &PgPool) -> i64 {
    sqlx::query_scalar("INSERT INTO organizations (name) VALUES ('acme') RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_campaign(pool: &PgPool, org: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO campaigns \
            (organization_id, name, subject, html_body, from_name, from_address, status_id) \
         VALUES ($1, 'Launch', 's', 'b', 'Acme', 'news@acme.test', $2) \
         RETURNING id",
    )
    .bind(org)
    .bind(CampaignStatus::Sending.id())
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_subscriber(pool: &PgPool, org: i64, email: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO subscribers (organization_id, email, status_id) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(org)
    .bind(email)
    .bind(SubscriberStatus::Active.id())
    .fetch_one(pool)
    .await
    .unwrap()
}

fn reconciler(pool: &PgPool) -> EventReconciler {
    EventReconciler::new(pool.clone(), Arc::new(MemoryDedupCache::new()))
}

fn event(json: serde_json::Value) -> ProviderEvent {
    serde_json::from_value(json).unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_open_counts_raw_but_not_unique(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    let sub = seed_subscriber(&pool, org, "ana@acme.test").await;
    let reconciler = reconciler(&pool);

    let open = serde_json::json!({"event": "open", "subscriber_id": sub, "campaign_id": campaign});
    reconciler.process_event(&event(open.clone())).await.unwrap();
    reconciler.process_event(&event(open)).await.unwrap();

    let row = CampaignRepo::find_by_id(&pool, campaign).await.unwrap().unwrap();
    assert_eq!(row.open_count, 2);
    assert_eq!(row.unique_open_count, 1);

    // Exactly one scorer invocation: baseline 50 + one open delta.
    let record = EngagementRepo::find_by_subscriber(&pool, sub).await.unwrap().unwrap();
    assert_eq!(record.engagement_score, 55);

    // Both opens are in the audit log regardless of dedup.
    let opens = EmailEventRepo::count_for_campaign(&pool, campaign, EmailEventType::Opened)
        .await
        .unwrap();
    assert_eq!(opens, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn every_click_counts_and_boosts_engagement(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    let sub = seed_subscriber(&pool, org, "ana@acme.test").await;
    let reconciler = reconciler(&pool);

    let click = serde_json::json!({
        "event": "click",
        "subscriber_id": sub,
        "campaign_id": campaign,
        "url": "https://acme.test/offer",
    });
    reconciler.process_event(&event(click.clone())).await.unwrap();
    reconciler.process_event(&event(click)).await.unwrap();

    let row = CampaignRepo::find_by_id(&pool, campaign).await.unwrap().unwrap();
    assert_eq!(row.click_count, 2, "repeat clicks always count");

    let record = EngagementRepo::find_by_subscriber(&pool, sub).await.unwrap().unwrap();
    assert_eq!(record.engagement_score, 70, "50 + 10 + 10: every click boosts");

    // The clicked URL is recorded on the audit events.
    let events = EmailEventRepo::list_for_campaign(&pool, campaign, 10, 0).await.unwrap();
    assert!(events
        .iter()
        .all(|e| e.metadata["url"] == "https://acme.test/offer"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn click_clamp_pins_score_at_100(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    let sub = seed_subscriber(&pool, org, "ana@acme.test").await;
    let reconciler = reconciler(&pool);

    // Drive the stored score to 95, then one more click overshoots to 105.
    EngagementRepo::apply_delta(&pool, sub, 45).await.unwrap();
    let click = serde_json::json!({
        "event": "click", "subscriber_id": sub, "campaign_id": campaign, "url": "https://a.test"
    });
    reconciler.process_event(&event(click)).await.unwrap();

    let record = EngagementRepo::find_by_subscriber(&pool, sub).await.unwrap().unwrap();
    assert_eq!(record.engagement_score, 100);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn hard_bounce_suppresses_and_soft_bounce_does_not(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    let hard = seed_subscriber(&pool, org, "hard@acme.test").await;
    let soft = seed_subscriber(&pool, org, "soft@acme.test").await;
    let reconciler = reconciler(&pool);

    reconciler
        .process_event(&event(serde_json::json!({
            "event": "bounce",
            "subscriber_id": hard,
            "campaign_id": campaign,
            "bounce_classification": "hard",
            "reason": "550 user unknown",
        })))
        .await
        .unwrap();
    reconciler
        .process_event(&event(serde_json::json!({
            "event": "bounce",
            "subscriber_id": soft,
            "campaign_id": campaign,
            "bounce_classification": "soft",
            "reason": "mailbox full",
        })))
        .await
        .unwrap();

    let hard_row = SubscriberRepo::find_by_id(&pool, hard).await.unwrap().unwrap();
    assert_eq!(hard_row.status_id, SubscriberStatus::Bounced.id());
    assert!(SuppressionRepo::is_suppressed(&pool, org, "hard@acme.test").await.unwrap());

    let soft_row = SubscriberRepo::find_by_id(&pool, soft).await.unwrap().unwrap();
    assert_eq!(soft_row.status_id, SubscriberStatus::Active.id());
    assert!(!SuppressionRepo::is_suppressed(&pool, org, "soft@acme.test").await.unwrap());

    // Both bounces are in the audit log.
    let bounces = EmailEventRepo::count_for_campaign(&pool, campaign, EmailEventType::Bounced)
        .await
        .unwrap();
    assert_eq!(bounces, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unsubscribe_records_and_penalizes(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    let sub = seed_subscriber(&pool, org, "ana@acme.test").await;
    let reconciler = reconciler(&pool);

    reconciler
        .process_event(&event(serde_json::json!({
            "event": "unsubscribe", "subscriber_id": sub, "campaign_id": campaign,
        })))
        .await
        .unwrap();

    let row = SubscriberRepo::find_by_id(&pool, sub).await.unwrap().unwrap();
    assert_eq!(row.status_id, SubscriberStatus::Unsubscribed.id());

    let unsubscribes: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM unsubscribe_records WHERE subscriber_id = $1 AND campaign_id = $2",
    )
    .bind(sub)
    .bind(campaign)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(unsubscribes, 1);

    let record = EngagementRepo::find_by_subscriber(&pool, sub).await.unwrap().unwrap();
    assert_eq!(record.engagement_score, 0, "baseline 50 minus the unsubscribe penalty");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn spam_complaint_resets_score_and_suppresses_unconditionally(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    let sub = seed_subscriber(&pool, org, "ana@acme.test").await;
    let reconciler = reconciler(&pool);

    // Build up engagement first; the complaint must wipe it to exactly 0.
    EngagementRepo::apply_delta(&pool, sub, 40).await.unwrap();

    reconciler
        .process_event(&event(serde_json::json!({
            "event": "spamreport", "subscriber_id": sub, "campaign_id": campaign,
        })))
        .await
        .unwrap();

    let row = SubscriberRepo::find_by_id(&pool, sub).await.unwrap().unwrap();
    assert_eq!(row.status_id, SubscriberStatus::Complained.id());
    assert!(SuppressionRepo::is_suppressed(&pool, org, "ana@acme.test").await.unwrap());

    let record = EngagementRepo::find_by_subscriber(&pool, sub).await.unwrap().unwrap();
    assert_eq!(record.engagement_score, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delivered_events_increment_without_dedup(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    seed_subscriber(&pool, org, "ana@acme.test").await;
    let reconciler = reconciler(&pool);

    let delivered = serde_json::json!({
        "event": "delivered", "email": "ana@acme.test", "campaign_id": campaign,
    });
    reconciler.process_event(&event(delivered.clone())).await.unwrap();
    reconciler.process_event(&event(delivered)).await.unwrap();

    let row = CampaignRepo::find_by_id(&pool, campaign).await.unwrap().unwrap();
    assert_eq!(row.delivered_count, 2, "duplicates are harmless extra increments");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn subscriber_resolves_by_address_with_id_fallback(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    let by_address = seed_subscriber(&pool, org, "ana@acme.test").await;
    let by_id = seed_subscriber(&pool, org, "bo@acme.test").await;
    let reconciler = reconciler(&pool);

    // Address present: resolves without any correlation id.
    reconciler
        .process_event(&event(serde_json::json!({
            "event": "open", "email": "ana@acme.test", "campaign_id": campaign,
        })))
        .await
        .unwrap();
    assert!(EngagementRepo::find_by_subscriber(&pool, by_address).await.unwrap().is_some());

    // Address missing from the payload: the correlation id fallback kicks in.
    reconciler
        .process_event(&event(serde_json::json!({
            "event": "open", "subscriber_id": by_id, "campaign_id": campaign,
        })))
        .await
        .unwrap();
    assert!(EngagementRepo::find_by_subscriber(&pool, by_id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_event_kinds_are_ignored(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    let sub = seed_subscriber(&pool, org, "ana@acme.test").await;
    let reconciler = reconciler(&pool);

    reconciler
        .process_event(&event(serde_json::json!({
            "event": "group_resubscribe", "subscriber_id": sub, "campaign_id": campaign,
        })))
        .await
        .unwrap();

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM email_events")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 0, "unrecognized kinds write nothing");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pg_backed_dedup_matches_memory_behavior(pool: PgPool) {
    let org = seed_org(&pool).await;
    let campaign = seed_campaign(&pool, org).await;
    let sub = seed_subscriber(&pool, org, "ana@acme.test").await;
    let reconciler = EventReconciler::new(pool.clone(), Arc::new(PgDedupCache::new(pool.clone())));

    let open = serde_json::json!({"event": "open", "subscriber_id": sub, "campaign_id": campaign});
    reconciler.process_event(&event(open.clone())).await.unwrap();
    reconciler.process_event(&event(open)).await.unwrap();

    let row = CampaignRepo::find_by_id(&pool, campaign).await.unwrap().unwrap();
    assert_eq!(row.open_count, 2);
    assert_eq!(row.unique_open_count, 1);
}
