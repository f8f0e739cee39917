//! Campaign scheduler loop.
//!
//! Each tick: plan queued campaigns whose scheduled time has passed, reap
//! jobs abandoned by crashed consumers, and complete campaigns whose queue
//! has drained. Per-campaign failures are isolated: the failing campaign is
//! marked Failed by the planner and the loop continues.

use tokio_util::sync::CancellationToken;

use mailroom_db::models::CampaignStatus;
use mailroom_db::repositories::{CampaignRepo, JobRepo};
use mailroom_db::DbPool;
use mailroom_dispatch::planner::{DispatchConfig, DispatchPlanner};
use mailroom_queue::JobQueue;

use crate::config::WorkerConfig;

/// Upper bound of campaigns handled per tick.
const CAMPAIGNS_PER_TICK: i64 = 50;

/// Run the scheduler until `cancel` fires.
pub async fn run(pool: DbPool, config: WorkerConfig, cancel: CancellationToken) {
    let queue = JobQueue::new(pool.clone());
    let dispatch_config = DispatchConfig {
        priority: config.send_priority,
        ..DispatchConfig::default()
    };

    tracing::info!(
        interval_secs = config.scheduler_interval.as_secs(),
        "Campaign scheduler started"
    );

    loop {
        tick(&pool, &queue, &dispatch_config, &config).await;

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.scheduler_interval) => {}
        }
    }

    tracing::info!("Campaign scheduler stopped");
}

async fn tick(
    pool: &DbPool,
    queue: &JobQueue,
    dispatch_config: &DispatchConfig,
    config: &WorkerConfig,
) {
    // Plan campaigns that are due.
    match CampaignRepo::list_due(pool, CAMPAIGNS_PER_TICK).await {
        Ok(campaigns) => {
            for campaign in campaigns {
                if let Err(err) =
                    DispatchPlanner::plan(pool, queue, dispatch_config, campaign.id).await
                {
                    // The planner already marked the campaign Failed.
                    tracing::error!(
                        campaign_id = campaign.id,
                        error = %err,
                        "Campaign dispatch failed"
                    );
                }
            }
        }
        Err(err) => tracing::error!(error = %err, "Failed to list due campaigns"),
    }

    // Redeliver jobs abandoned by crashed consumers.
    match JobRepo::requeue_stuck(pool, config.job_visibility_timeout).await {
        Ok(0) => {}
        Ok(reaped) => tracing::warn!(reaped, "Requeued jobs abandoned past visibility timeout"),
        Err(err) => tracing::error!(error = %err, "Failed to requeue stuck jobs"),
    }

    // Complete campaigns whose queue has drained.
    match CampaignRepo::list_by_status(pool, CampaignStatus::Sending, CAMPAIGNS_PER_TICK).await {
        Ok(campaigns) => {
            for campaign in campaigns {
                match CampaignRepo::complete_if_drained(pool, campaign.id).await {
                    Ok(true) => {
                        tracing::info!(campaign_id = campaign.id, "Campaign send completed")
                    }
                    Ok(false) => {}
                    Err(err) => tracing::error!(
                        campaign_id = campaign.id,
                        error = %err,
                        "Failed to check campaign completion"
                    ),
                }
            }
        }
        Err(err) => tracing::error!(error = %err, "Failed to list sending campaigns"),
    }
}
