use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use shared_database::AppState;

use crate::ReminderScanner;

/// Optional in-process driver for the scanner.
///
/// Sweeps run back to back on the loop task, so they never overlap. `shutdown` stops the
/// next sweep from starting; a sweep already underway runs to completion.
pub struct ReminderScheduler {
    scanner: Arc<ReminderScanner>,
    interval: Duration,
    shutdown: watch::Sender<bool>,
}

impl ReminderScheduler {
    pub fn new(scanner: Arc<ReminderScanner>, interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            scanner,
            interval,
            shutdown,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::new(ReminderScanner::new(state)),
            Duration::from_secs(state.config.reminder_sweep_interval_seconds.max(1)),
        )
    }

    /// Runs until `shutdown` is called and returns the number of sweeps started.
    pub async fn run(&self) -> u64 {
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweeps = 0;

        info!("Reminder scheduler started, sweeping every {:?}", self.interval);

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    sweeps += 1;
                    if let Err(e) = self.scanner.sweep().await {
                        error!("Reminder sweep {} failed: {}", sweeps, e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Reminder scheduler stopped after {} sweeps", sweeps);
        sweeps
    }

    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }
}
