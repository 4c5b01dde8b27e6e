use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use salon_channels::{CalendarClient, MessagingGateway};
use sqlx::SqlitePool;
use tokio::sync::watch;
use tracing::{error, info};

use crate::jobs;
use crate::schedule::{compute_next_run, Trigger};

/// Drives the three fixed periodic jobs (§4.13): confirmation sends and
/// auto-cancellation daily at 10:00, reminder sends hourly. Polls at ±1s
/// precision like the teacher's job engine, but against a fixed trigger set
/// rather than a persisted job table — there is nothing here for an operator
/// to add or remove.
pub struct SchedulerEngine {
    pool: SqlitePool,
    gateway: Arc<dyn MessagingGateway>,
    calendar: Arc<dyn CalendarClient>,
    health_dir: PathBuf,
    confirmation_hours_before: i64,
    auto_cancel_hours_before: i64,
    reminder_hours_before: i64,
}

impl SchedulerEngine {
    pub fn new(
        pool: SqlitePool,
        gateway: Arc<dyn MessagingGateway>,
        calendar: Arc<dyn CalendarClient>,
        health_dir: PathBuf,
        confirmation_hours_before: i64,
        auto_cancel_hours_before: i64,
        reminder_hours_before: i64,
    ) -> Self {
        Self {
            pool,
            gateway,
            calendar,
            health_dir,
            confirmation_hours_before,
            auto_cancel_hours_before,
            reminder_hours_before,
        }
    }

    /// Main event loop. Polls every second until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("confirmation scheduler started");

        let mut next_daily = compute_next_run(Trigger::Daily { hour: 10, minute: 0 }, Utc::now());
        let mut next_hourly = compute_next_run(Trigger::Hourly, Utc::now());

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Utc::now();

                    if now >= next_daily {
                        self.run_daily_jobs(now).await;
                        next_daily = compute_next_run(Trigger::Daily { hour: 10, minute: 0 }, now);
                    }

                    if now >= next_hourly {
                        self.run_hourly_job(now).await;
                        next_hourly = compute_next_run(Trigger::Hourly, now);
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("confirmation scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn run_daily_jobs(&self, now: chrono::DateTime<Utc>) {
        match jobs::send_confirmations(&self.pool, self.gateway.as_ref(), self.confirmation_hours_before, now).await {
            Ok(record) => {
                if let Err(e) = crate::health::write(&self.health_dir, &record) {
                    error!("failed to write health record: {e}");
                }
            }
            Err(e) => error!("send_confirmations job failed: {e}"),
        }

        match jobs::auto_cancel(
            &self.pool,
            self.gateway.as_ref(),
            self.calendar.as_ref(),
            self.auto_cancel_hours_before,
            now,
        )
        .await
        {
            Ok(record) => {
                if let Err(e) = crate::health::write(&self.health_dir, &record) {
                    error!("failed to write health record: {e}");
                }
            }
            Err(e) => error!("auto_cancel job failed: {e}"),
        }
    }

    async fn run_hourly_job(&self, now: chrono::DateTime<Utc>) {
        match jobs::send_reminders(&self.pool, self.gateway.as_ref(), self.reminder_hours_before, now).await {
            Ok(record) => {
                if let Err(e) = crate::health::write(&self.health_dir, &record) {
                    error!("failed to write health record: {e}");
                }
            }
            Err(e) => error!("send_reminders job failed: {e}"),
        }
    }
}
