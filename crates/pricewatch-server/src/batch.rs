//! Tracked full-batch scrape runs shared by the scheduler and the API.
//!
//! At most one batch runs per process. Both triggers go through
//! [`BatchRunner::trigger`], which claims the [`BatchLock`] before a run row
//! is created so an overlapping request never leaves a queued run behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pricewatch_core::AppConfig;
use pricewatch_db::{DbError, ScrapeRunRow};
use sqlx::PgPool;

/// Process-wide "a batch is running" flag.
#[derive(Debug, Clone, Default)]
pub struct BatchLock {
    running: Arc<AtomicBool>,
}

/// Held for the lifetime of a batch; dropping it releases the lock, even if
/// the batch task panics.
#[derive(Debug)]
pub struct BatchGuard {
    running: Arc<AtomicBool>,
}

impl BatchLock {
    /// Claims the lock, or returns `None` if a batch is already running.
    #[must_use]
    pub fn try_acquire(&self) -> Option<BatchGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BatchGuard {
                running: Arc::clone(&self.running),
            })
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Starts tracked batches over the whole wish list.
#[derive(Clone)]
pub struct BatchRunner {
    pool: PgPool,
    config: Arc<AppConfig>,
    lock: BatchLock,
}

impl BatchRunner {
    #[must_use]
    pub fn new(pool: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            pool,
            config,
            lock: BatchLock::default(),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock.is_running()
    }

    #[cfg(test)]
    pub(crate) fn lock(&self) -> &BatchLock {
        &self.lock
    }

    /// Queues a run and executes it on a background task.
    ///
    /// Returns `Ok(None)` without touching the database when another batch
    /// holds the lock.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the run row cannot be created.
    pub async fn trigger(&self, trigger_source: &str) -> Result<Option<ScrapeRunRow>, DbError> {
        let Some(guard) = self.lock.try_acquire() else {
            return Ok(None);
        };

        let run = pricewatch_db::create_scrape_run(&self.pool, trigger_source).await?;
        tracing::info!(
            run_id = run.id,
            public_id = %run.public_id,
            trigger_source,
            "scrape run queued"
        );

        let pool = self.pool.clone();
        let config = Arc::clone(&self.config);
        let run_id = run.id;
        tokio::spawn(async move {
            let _guard = guard;
            execute_run(&pool, &config, run_id).await;
        });

        Ok(Some(run))
    }
}

/// Drives one queued run to `succeeded` or `failed`.
async fn execute_run(pool: &PgPool, config: &AppConfig, run_id: i64) {
    if let Err(e) = pricewatch_db::start_scrape_run(pool, run_id).await {
        tracing::error!(run_id, error = %e, "failed to start scrape run");
        fail_run_best_effort(pool, run_id, e.to_string()).await;
        return;
    }

    let items = match pricewatch_db::list_wish_items(pool).await {
        Ok(rows) => rows
            .iter()
            .map(pricewatch_db::WishItemRow::to_wish_item)
            .collect::<Vec<_>>(),
        Err(e) => {
            tracing::error!(run_id, error = %e, "failed to load wish items");
            fail_run_best_effort(pool, run_id, e.to_string()).await;
            return;
        }
    };

    let sink = Arc::new(pricewatch_db::PgHistorySink::for_run(pool.clone(), run_id));
    let orchestrator = match pricewatch_scraper::build_orchestrator(config, sink) {
        Ok(o) => o,
        Err(e) => {
            tracing::error!(run_id, error = %e, "failed to build scraper");
            fail_run_best_effort(pool, run_id, e.to_string()).await;
            return;
        }
    };

    let batch = orchestrator.run(&items).await;

    match pricewatch_db::finish_scrape_run(pool, run_id, &batch).await {
        Ok(totals) => tracing::info!(
            run_id,
            items = totals.items_processed,
            offers = totals.offers_found,
            failures = totals.failures_count,
            "scrape run succeeded"
        ),
        Err(e) => {
            tracing::error!(run_id, error = %e, "failed to complete scrape run");
            fail_run_best_effort(pool, run_id, e.to_string()).await;
        }
    }
}

/// Attempt to mark a scrape run as failed, logging any secondary error.
async fn fail_run_best_effort(pool: &PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = pricewatch_db::fail_scrape_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark scrape run as failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_admits_one_holder_at_a_time() {
        let lock = BatchLock::default();
        let guard = lock.try_acquire().expect("first acquire");
        assert!(lock.is_running());
        assert!(lock.try_acquire().is_none());
        drop(guard);
        assert!(!lock.is_running());
        assert!(lock.try_acquire().is_some());
    }

    #[test]
    fn clones_share_the_same_flag() {
        let lock = BatchLock::default();
        let other = lock.clone();
        let _guard = lock.try_acquire().expect("acquire");
        assert!(other.is_running());
        assert!(other.try_acquire().is_none());
    }

    #[tokio::test]
    async fn guard_is_released_when_task_panics() {
        let lock = BatchLock::default();
        let guard = lock.try_acquire().expect("acquire");
        let handle = tokio::spawn(async move {
            let _guard = guard;
            panic!("batch blew up");
        });
        assert!(handle.await.is_err());
        assert!(!lock.is_running());
    }
}
