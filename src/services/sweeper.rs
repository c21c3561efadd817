//! Background job that clears abandoned cart items.

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::services::cart;

/// Schedules the stale-cart sweep, daily at 03:00.
pub async fn start(
    pool: PgPool,
    max_age_days: i64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let sched = JobScheduler::new().await?;

    let job = Job::new_async("0 0 3 * * *", move |_uuid, _l| {
        let pool = pool.clone();
        Box::pin(async move {
            match cart::sweep_stale(&pool, max_age_days).await {
                Ok(0) => log::debug!("Cart sweep: nothing to remove"),
                Ok(removed) => log::info!("Cart sweep removed {} stale items", removed),
                Err(e) => log::error!("Cart sweep failed: {}", e),
            }
        })
    })?;

    sched.add(job).await?;

    // Run the scheduler loop off the request path.
    tokio::spawn(async move {
        if let Err(e) = sched.start().await {
            log::error!("Scheduler error: {}", e);
        }
    });

    log::info!("Stale-cart sweeper scheduled (max age {} days)", max_age_days);
    Ok(())
}
