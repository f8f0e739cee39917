use std::time::Duration;

use url::Url;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of parallel send consumers (default: `4`).
    pub concurrency: usize,
    /// Campaign scheduler poll interval in seconds (default: `15`).
    pub scheduler_interval: Duration,
    /// How long a claimed job may run before it is considered abandoned and
    /// redelivered (default: `300` seconds).
    pub job_visibility_timeout: Duration,
    /// Base URL for tracking beacons, click redirects, and unsubscribe pages.
    pub tracking_base: Url,
    /// Queue priority for send jobs (default: `0`).
    pub send_priority: i32,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                     |
    /// |------------------------------|-----------------------------|
    /// | `WORKER_CONCURRENCY`         | `4`                         |
    /// | `SCHEDULER_INTERVAL_SECS`    | `15`                        |
    /// | `JOB_VISIBILITY_TIMEOUT_SECS`| `300`                       |
    /// | `TRACKING_BASE_URL`          | `http://localhost:3100`     |
    /// | `SEND_PRIORITY`              | `0`                         |
    pub fn from_env() -> anyhow::Result<Self> {
        let concurrency: usize = std::env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "4".into())
            .parse()?;
        let scheduler_interval_secs: u64 = std::env::var("SCHEDULER_INTERVAL_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()?;
        let job_visibility_timeout_secs: u64 = std::env::var("JOB_VISIBILITY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()?;
        let tracking_base = Url::parse(
            &std::env::var("TRACKING_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3100".into()),
        )?;
        let send_priority: i32 = std::env::var("SEND_PRIORITY")
            .unwrap_or_else(|_| "0".into())
            .parse()?;

        Ok(Self {
            concurrency,
            scheduler_interval: Duration::from_secs(scheduler_interval_secs),
            job_visibility_timeout: Duration::from_secs(job_visibility_timeout_secs),
            tracking_base,
            send_priority,
        })
    }
}
