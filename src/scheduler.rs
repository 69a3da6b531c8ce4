//! # Sync Scheduler
//!
//! Background task that fires once a day at the configured local hour and
//! re-syncs every stale imported product. A manual trigger runs the same
//! bulk sync on demand and reports its result to the caller.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use metrics::{gauge, histogram};
use tokio::sync::RwLock;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SyncConfig;
use crate::error::CatalogError;
use crate::import::ImportOrchestrator;

/// Count recorded when a scheduled or manual run fails.
pub const FAILED_RUN_COUNT: i64 = -1;

#[derive(Debug, Clone, Default)]
struct RunState {
    last_run_at: Option<DateTime<Utc>>,
    last_count: Option<i64>,
    next_run_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of the scheduler for the status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerStatus {
    pub enabled: bool,
    pub run_hour: u32,
    pub stale_after_days: u32,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Products synced by the last run, `-1` when it failed
    pub last_count: Option<i64>,
    pub next_run_at: Option<DateTime<Utc>>,
}

/// Daily catalog sync scheduler.
pub struct CatalogSyncScheduler {
    orchestrator: Arc<ImportOrchestrator>,
    config: SyncConfig,
    state: RwLock<RunState>,
}

impl CatalogSyncScheduler {
    pub fn new(orchestrator: Arc<ImportOrchestrator>, config: SyncConfig) -> Self {
        Self {
            orchestrator,
            config,
            state: RwLock::new(RunState::default()),
        }
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            enabled = self.config.enabled,
            run_hour = self.config.run_hour,
            "Starting catalog sync scheduler"
        );

        loop {
            let now = Local::now();
            let next = next_fire_after(&now, self.config.run_hour);
            let wait = (next - now).to_std().unwrap_or_default();
            self.state.write().await.next_run_at = Some(next.with_timezone(&Utc));
            debug!(next_run_at = %next, "Scheduled next catalog sync");

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Catalog sync scheduler shutdown requested");
                    break;
                }
                _ = sleep(wait) => {
                    self.run_scheduled_sync().await;
                }
            }
        }

        info!("Catalog sync scheduler stopped");
    }

    /// One scheduled fire. Returns the synced count, or `None` when the run
    /// was skipped or failed.
    pub async fn run_scheduled_sync(&self) -> Option<usize> {
        if !self.config.enabled {
            debug!("Scheduled catalog sync disabled, skipping");
            return None;
        }

        let client = self.orchestrator.client();
        if !client.has_credentials() {
            warn!("Game database credentials missing, skipping scheduled sync");
            return None;
        }

        if !client.is_api_available().await {
            warn!("Game database unavailable, aborting scheduled sync");
            return None;
        }

        let started = Instant::now();
        let result = self
            .orchestrator
            .sync_stale_products(self.config.interval_days)
            .await;
        histogram!("catalog_scheduled_sync_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(count) => {
                info!(count, "Scheduled catalog sync finished");
                self.record_run(count as i64).await;
                Some(count)
            }
            Err(CatalogError::SyncInProgress) => {
                warn!("Another catalog sync is running, skipping scheduled fire");
                None
            }
            Err(err) => {
                error!(error = %err, "Scheduled catalog sync failed");
                self.record_run(FAILED_RUN_COUNT).await;
                None
            }
        }
    }

    /// Runs the bulk sync now. Only requires credentials; errors propagate.
    #[instrument(skip(self))]
    pub async fn manual_trigger(&self) -> Result<usize, CatalogError> {
        if !self.orchestrator.client().has_credentials() {
            return Err(CatalogError::AuthConfiguration);
        }

        info!("Manual catalog sync triggered");
        match self
            .orchestrator
            .sync_stale_products(self.config.interval_days)
            .await
        {
            Ok(count) => {
                self.record_run(count as i64).await;
                Ok(count)
            }
            Err(CatalogError::SyncInProgress) => Err(CatalogError::SyncInProgress),
            Err(err) => {
                self.record_run(FAILED_RUN_COUNT).await;
                Err(err)
            }
        }
    }

    pub async fn status(&self) -> SchedulerStatus {
        let state = self.state.read().await.clone();
        SchedulerStatus {
            enabled: self.config.enabled,
            run_hour: self.config.run_hour,
            stale_after_days: self.config.interval_days,
            last_run_at: state.last_run_at,
            last_count: state.last_count,
            next_run_at: state.next_run_at,
        }
    }

    async fn record_run(&self, count: i64) {
        let mut state = self.state.write().await;
        state.last_run_at = Some(Utc::now());
        state.last_count = Some(count);
        gauge!("catalog_sync_last_count").set(count as f64);
    }
}

/// First instant strictly after `now` whose wall clock reads `run_hour:00:00`.
/// Days where that hour does not exist (DST gaps) are skipped.
pub fn next_fire_after<Tz: TimeZone>(now: &DateTime<Tz>, run_hour: u32) -> DateTime<Tz> {
    let tz = now.timezone();
    let hour = run_hour.min(23);
    let mut day = now.date_naive();

    for _ in 0..3 {
        if let Some(candidate) = day
            .and_hms_opt(hour, 0, 0)
            .and_then(|naive| tz.from_local_datetime(&naive).earliest())
            && candidate > *now
        {
            return candidate;
        }
        match day.succ_opt() {
            Some(next_day) => day = next_day,
            None => break,
        }
    }

    now.clone() + Duration::days(1)
}
