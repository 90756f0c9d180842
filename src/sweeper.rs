//! Periodic deletion of expired pastes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::db::Database;

pub struct Sweeper {
    database: Database,
    period: Duration,
    grace: Duration,
}

impl Sweeper {
    pub fn new(database: Database, period: Duration, grace: Duration) -> Self {
        Sweeper {
            database,
            period,
            grace,
        }
    }

    /// Delete every paste that expired at or before `now`.
    pub async fn run_once(&mut self, now: DateTime<Utc>) -> crate::AppResult<u64> {
        let deleted = self.database.delete_expired(now).await?;

        for identifier in &deleted {
            info!("deleted expired paste: {identifier}");
        }
        if !deleted.is_empty() {
            info!("deleted {count} pastes", count = deleted.len());
        }

        Ok(deleted.len() as u64)
    }

    /// Spawn the sweep loop. The first sweep runs one period from now.
    pub fn start(mut self) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                "expiry sweeper started: period={}s, grace={}s",
                self.period.as_secs(),
                self.grace.as_secs()
            );

            loop {
                let scheduled = tokio::select! {
                    _ = token.cancelled() => break,
                    scheduled = interval.tick() => scheduled,
                };

                if !within_grace(scheduled, Instant::now(), self.grace) {
                    warn!("skipping expiry sweep that started too late");
                    continue;
                }

                if let Err(err) = self.run_once(Utc::now()).await {
                    error!("expiry sweep failed: {err:?}");
                }
            }

            info!("expiry sweeper stopped");
        });

        SweeperHandle { cancel, task }
    }
}

/// Whether a tick scheduled for `scheduled` and observed at `now` may still run.
fn within_grace(scheduled: Instant, now: Instant, grace: Duration) -> bool {
    now.saturating_duration_since(scheduled) <= grace
}

pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the loop, waiting for an in-flight sweep to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            error!("expiry sweeper task panicked: {err}");
        }
    }
}
