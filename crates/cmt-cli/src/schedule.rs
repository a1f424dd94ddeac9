//! Recurring report runs driven by `tokio-cron-scheduler`.

use std::sync::Arc;

use cmt_core::AppConfig;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::report::{run_report, ReportOptions};

/// Register the weekly report job and block until Ctrl-C.
pub(crate) async fn run_schedule(config: AppConfig, cron: Option<String>) -> anyhow::Result<()> {
    let cron = cron.unwrap_or_else(|| config.report_schedule.clone());
    let mut scheduler = build_scheduler(Arc::new(config), &cron).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("received shutdown signal, stopping scheduler");
    scheduler.shutdown().await?;
    Ok(())
}

/// Builds and starts a scheduler with the report job registered.
///
/// The returned handle must be kept alive; dropping it stops the job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if `cron` does not parse or the scheduler
/// fails to start.
async fn build_scheduler(
    config: Arc<AppConfig>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let config = Arc::clone(&config);
        Box::pin(async move {
            tracing::info!("scheduler: starting report run");
            match run_report(&config, &ReportOptions::default()).await {
                Ok(()) => tracing::info!("scheduler: report run complete"),
                Err(e) => tracing::error!(error = %e, "scheduler: report run failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered report job");
    scheduler.start().await?;
    Ok(scheduler)
}
