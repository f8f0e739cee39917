use std::time::Duration;

use sqlx::PgPool;

use mailroom_db::repositories::DedupRepo;

#[sqlx::test(migrations = "../../db/migrations")]
async fn first_set_wins_the_window(pool: PgPool) {
    let key = "engagement:7:3:open";
    assert!(DedupRepo::set_if_absent(&pool, key, Duration::from_secs(1800)).await.unwrap());
    assert!(!DedupRepo::set_if_absent(&pool, key, Duration::from_secs(1800)).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_key_can_be_claimed_again(pool: PgPool) {
    let key = "engagement:7:3:open";
    assert!(DedupRepo::set_if_absent(&pool, key, Duration::from_secs(1800)).await.unwrap());

    // Expire the key manually instead of sleeping through a TTL.
    sqlx::query("UPDATE dedup_keys SET expires_at = NOW() - INTERVAL '1 second' WHERE key = $1")
        .bind(key)
        .execute(&pool)
        .await
        .unwrap();

    assert!(DedupRepo::set_if_absent(&pool, key, Duration::from_secs(1800)).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_frees_the_key(pool: PgPool) {
    let key = "score:7";
    assert!(DedupRepo::set_if_absent(&pool, key, Duration::from_secs(60)).await.unwrap());
    DedupRepo::delete(&pool, key).await.unwrap();
    assert!(DedupRepo::set_if_absent(&pool, key, Duration::from_secs(60)).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn purge_removes_only_expired_keys(pool: PgPool) {
    DedupRepo::set_if_absent(&pool, "live", Duration::from_secs(1800)).await.unwrap();
    DedupRepo::set_if_absent(&pool, "dead", Duration::from_secs(1800)).await.unwrap();
    sqlx::query("UPDATE dedup_keys SET expires_at = NOW() - INTERVAL '1 minute' WHERE key = 'dead'")
        .execute(&pool)
        .await
        .unwrap();

    let purged = DedupRepo::purge_expired(&pool).await.unwrap();
    assert_eq!(purged, 1);
    assert!(!DedupRepo::set_if_absent(&pool, "live", Duration::from_secs(60)).await.unwrap());
}
