//! Shared seed helpers for repository tests.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use sqlx::PgPool;

use mailroom_db::models::{CampaignStatus, SubscriberStatus};

pub type DbId = i64;

/// Insert an organization, returning its id.
pub async fn seed_org(pool: &PgPool, name: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO organizations (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("seed organization")
}

/// Insert a campaign in the given status, returning its id.
pub async fn seed_campaign(pool: &PgPool, org_id: DbId, status: CampaignStatus) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO campaigns \
            (organization_id, name, subject, html_body, from_name, from_address, status_id) \
         VALUES ($1, 'Spring Launch', 'Hi {{firstName}}', \
                 '<html><body><p>Hi {{firstName}}</p></body></html>', \
                 'Acme', 'news@acme.test', $2) \
         RETURNING id",
    )
    .bind(org_id)
    .bind(status.id())
    .fetch_one(pool)
    .await
    .expect("seed campaign")
}

/// Insert a subscriber in the given status, returning its id.
pub async fn seed_subscriber(
    pool: &PgPool,
    org_id: DbId,
    email: &str,
    status: SubscriberStatus,
) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO subscribers (organization_id, email, first_name, status_id) \
         VALUES ($1, $2, 'Ana', $3) \
         RETURNING id",
    )
    .bind(org_id)
    .bind(email)
    .bind(status.id())
    .fetch_one(pool)
    .await
    .expect("seed subscriber")
}
