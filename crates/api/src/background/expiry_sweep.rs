//! Periodic lapse of expired profiles.
//!
//! Flips every active profile whose `expiry_date` is before today to
//! `inactive`. The first tick fires immediately, so a sweep runs at startup
//! and then once per configured interval. The outcome of the latest run is
//! kept in a [`SweepMonitor`] for `/health`.

use std::sync::Arc;
use std::time::Duration;

use biodata_core::expiry::SweepReport;
use biodata_core::types::{today_utc, CalendarDate, Timestamp};
use biodata_db::repositories::ProfileRepo;
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Outcome of the most recent sweep, scheduled or on demand.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepStatus {
    /// When the last sweep finished. `None` until the first run.
    pub last_run_at: Option<Timestamp>,
    /// Profiles lapsed by the last successful sweep.
    pub last_updated_count: Option<u64>,
    pub last_error: Option<String>,
    /// Failed sweeps since the last success.
    pub consecutive_failures: u32,
}

impl SweepStatus {
    pub fn is_failing(&self) -> bool {
        self.consecutive_failures > 0
    }
}

/// Shared record of sweep outcomes.
#[derive(Debug, Default)]
pub struct SweepMonitor {
    status: RwLock<SweepStatus>,
}

impl SweepMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> SweepStatus {
        self.status.read().await.clone()
    }

    async fn record(&self, outcome: &Result<SweepReport, sqlx::Error>) {
        let mut status = self.status.write().await;
        status.last_run_at = Some(chrono::Utc::now());
        match outcome {
            Ok(report) => {
                status.last_updated_count = Some(report.updated_count);
                status.last_error = None;
                status.consecutive_failures = 0;
            }
            Err(e) => {
                status.last_error = Some(e.to_string());
                status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            }
        }
    }
}

/// Run one sweep for `today`, log the outcome and record it in `monitor`.
pub async fn sweep(
    pool: &PgPool,
    today: CalendarDate,
    monitor: &SweepMonitor,
) -> Result<SweepReport, sqlx::Error> {
    let outcome = ProfileRepo::expire_overdue(pool, today).await;
    monitor.record(&outcome).await;

    let report = outcome?;
    if report.is_empty() {
        tracing::debug!(%today, "Expiry sweep: nothing to lapse");
    } else {
        tracing::info!(
            %today,
            updated_count = report.updated_count,
            affected_ids = ?report.affected_ids,
            "Expiry sweep: profiles marked inactive"
        );
    }
    Ok(report)
}

/// Run the expiry sweep loop until `cancel` is triggered.
///
/// A failed tick is logged and the loop waits for the next one.
pub async fn run(
    pool: PgPool,
    every: Duration,
    monitor: Arc<SweepMonitor>,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = every.as_secs(), "Expiry sweep job started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Expiry sweep job stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = sweep(&pool, today_utc(), &monitor).await {
                    let consecutive_failures = monitor.snapshot().await.consecutive_failures;
                    tracing::error!(
                        error = %e,
                        consecutive_failures,
                        "Expiry sweep failed"
                    );
                }
            }
        }
    }
}
