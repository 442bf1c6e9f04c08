//! Background job scheduler.
//!
//! Registers the nightly full-batch scrape on `PRICEWATCH_SCHEDULE_CRON`.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::batch::BatchRunner;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    runner: BatchRunner,
    cron: &str,
    enabled: bool,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    if enabled {
        register_scrape_job(&scheduler, runner, cron).await?;
    } else {
        tracing::info!("scheduler: nightly scrape disabled by PRICEWATCH_SCHEDULE_ENABLED");
    }

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_scrape_job(
    scheduler: &JobScheduler,
    runner: BatchRunner,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let runner = runner.clone();

        Box::pin(async move {
            match runner.trigger("schedule").await {
                Ok(Some(run)) => {
                    tracing::info!(public_id = %run.public_id, "scheduler: nightly scrape started");
                }
                Ok(None) => {
                    tracing::warn!("scheduler: previous scrape still running; skipping this tick");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: failed to queue nightly scrape");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: nightly scrape registered");
    Ok(())
}
