//! Worker binary: campaign scheduler plus the bounded send worker pool.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailroom_dispatch::http_api::{HttpApiConfig, HttpApiProvider};
use mailroom_dispatch::sender::{SendJobHandler, SenderConfig};
use mailroom_dispatch::smtp::{SmtpConfig, SmtpProvider};
use mailroom_dispatch::EmailProvider;
use mailroom_queue::WorkerPool;

mod config;
mod scheduler;

use config::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailroom_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;
    tracing::info!(
        concurrency = config.concurrency,
        tracking_base = %config.tracking_base,
        "Loaded worker configuration"
    );

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let pool = mailroom_db::connect(&database_url).await?;
    mailroom_db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let provider = build_provider()?;

    let cancel = CancellationToken::new();
    let scheduler_handle = tokio::spawn(scheduler::run(
        pool.clone(),
        config.clone(),
        cancel.clone(),
    ));

    let handler = Arc::new(SendJobHandler::new(
        pool.clone(),
        provider,
        SenderConfig {
            tracking_base: config.tracking_base.clone(),
        },
    ));
    let worker_pool = WorkerPool::new(pool.clone(), config.concurrency);
    let pool_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker_pool.run(handler, cancel).await })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, draining workers");
    cancel.cancel();

    let _ = scheduler_handle.await;
    let _ = pool_handle.await;
    tracing::info!("Worker shut down cleanly");
    Ok(())
}

/// Select the delivery provider from the environment: SMTP when `SMTP_HOST`
/// is set, otherwise the HTTP API when `MAIL_API_ENDPOINT` is set.
fn build_provider() -> anyhow::Result<Arc<dyn EmailProvider>> {
    if let Some(smtp) = SmtpConfig::from_env() {
        tracing::info!(host = %smtp.host, port = smtp.port, "Using SMTP delivery provider");
        return Ok(Arc::new(SmtpProvider::new(smtp)));
    }
    if let Some(http) = HttpApiConfig::from_env() {
        tracing::info!(endpoint = %http.endpoint, "Using HTTP API delivery provider");
        return Ok(Arc::new(HttpApiProvider::new(http)));
    }
    anyhow::bail!("No delivery provider configured: set SMTP_HOST or MAIL_API_ENDPOINT")
}
