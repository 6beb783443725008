use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use tracing::{debug, error, info, instrument, warn};

use shared_database::{AppState, KeyValueStore, StoreError};

use crate::{
    AppointmentRecord, ReminderDispatcher, ReminderError, ReminderOutcome, ReminderRegistry,
    ReminderSubscription, SweepReport,
};

pub const SENT_MARKER_TTL_SECONDS: u64 = 24 * 60 * 60;

pub fn sent_marker_key(appointment_id: &str, date: &str) -> String {
    format!("reminder_sent:{}:{}", appointment_id, date.trim())
}

/// True while `now` sits inside `[reminder time, reminder time + catch_window]`.
///
/// A lead time that cannot be represented is an error for this subscription only.
pub fn reminder_due(
    appointment_at: DateTime<Utc>,
    lead_minutes: i64,
    now: DateTime<Utc>,
    catch_window: Duration,
) -> Result<bool, ReminderError> {
    let reminder_at = Duration::try_minutes(lead_minutes)
        .and_then(|lead| appointment_at.checked_sub_signed(lead))
        .ok_or_else(|| {
            ReminderError::InvalidConfiguration(format!(
                "Lead time of {} minutes is out of range",
                lead_minutes
            ))
        })?;
    let delta = now.signed_duration_since(reminder_at);
    Ok(delta >= Duration::zero() && delta <= catch_window)
}

/// One sweep over every reminder subscription.
///
/// The scanner keeps no state between sweeps: the per-day sent marker in the store is the
/// only record of what already fired, so any number of instances may share the trigger.
pub struct ReminderScanner {
    store: Arc<dyn KeyValueStore>,
    registry: ReminderRegistry,
    dispatcher: ReminderDispatcher,
    catch_window: Duration,
    lookup_timeout: std::time::Duration,
    clinic_offset: FixedOffset,
}

impl ReminderScanner {
    pub fn new(state: &AppState) -> Self {
        let config = &state.config;
        let clinic_offset = FixedOffset::east_opt(config.clinic_utc_offset_minutes * 60)
            .unwrap_or_else(|| {
                warn!(
                    "Clinic offset of {} minutes is out of range, using UTC",
                    config.clinic_utc_offset_minutes
                );
                Utc.fix()
            });

        Self {
            store: state.store.clone(),
            registry: ReminderRegistry::new(state),
            dispatcher: ReminderDispatcher::new(state),
            catch_window: Duration::minutes(config.reminder_catch_window_minutes),
            lookup_timeout: std::time::Duration::from_millis(config.reminder_lookup_timeout_ms),
            clinic_offset,
        }
    }

    pub async fn sweep(&self) -> Result<SweepReport, ReminderError> {
        self.sweep_at(Utc::now()).await
    }

    /// Only a failure to enumerate the registries aborts the sweep; anything that goes
    /// wrong with a single subscription is logged and counted.
    #[instrument(skip(self))]
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, ReminderError> {
        let started = Instant::now();
        let mut report = SweepReport::default();

        let keys = self.within(self.registry.registry_keys()).await.map_err(|e| {
            error!("Reminder sweep aborted, cannot enumerate subscriptions: {}", e);
            e
        })?;

        for key in keys {
            let subscriptions = match self.within(self.registry.load_registry(&key)).await {
                Ok(subscriptions) => subscriptions,
                Err(e) => {
                    warn!("Skipping reminder registry {}: {}", key, e);
                    report.failed_reminders += 1;
                    continue;
                }
            };

            for subscription in subscriptions.iter().filter(|subscription| subscription.enabled) {
                report.total_reminders += 1;

                match self.process(subscription, now).await {
                    Ok(ReminderOutcome::Sent) => report.sent_reminders += 1,
                    Ok(outcome) => {
                        debug!(
                            "Reminder for appointment {} skipped: {:?}",
                            subscription.appointment_id, outcome
                        );
                        report.skipped_reminders += 1;
                    }
                    Err(e) => {
                        warn!(
                            "Reminder for appointment {} (user {}) failed: {}",
                            subscription.appointment_id, subscription.user_id, e
                        );
                        report.failed_reminders += 1;
                    }
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Reminder sweep finished: {} scanned, {} sent, {} skipped, {} failed in {} ms",
            report.total_reminders,
            report.sent_reminders,
            report.skipped_reminders,
            report.failed_reminders,
            report.duration_ms
        );

        Ok(report)
    }

    async fn process(
        &self,
        subscription: &ReminderSubscription,
        now: DateTime<Utc>,
    ) -> Result<ReminderOutcome, ReminderError> {
        let appointment = match self
            .within(self.dispatcher.find_appointment(&subscription.appointment_id))
            .await?
        {
            Some(appointment) if !appointment.is_cancelled() => appointment,
            _ => return Ok(ReminderOutcome::AppointmentMissing),
        };

        let appointment_at = appointment.starts_at(self.clinic_offset)?;
        if !reminder_due(appointment_at, subscription.lead_minutes, now, self.catch_window)? {
            return Ok(ReminderOutcome::NotDue);
        }

        // Claim before sending so overlapping sweeps cannot both deliver.
        let marker = sent_marker_key(&appointment.id, &appointment.date);
        let claimed = self
            .within(self.store.set_if_absent(&marker, "true", Some(SENT_MARKER_TTL_SECONDS)))
            .await?;
        if !claimed {
            return Ok(ReminderOutcome::AlreadySent);
        }

        match self.deliver(subscription, &appointment).await {
            Ok(()) => Ok(ReminderOutcome::Sent),
            Err(e) => {
                // A timed-out write may still land, so only a definite failure frees the marker.
                if !e.is_timeout() {
                    if let Err(release_error) = self.store.delete(&marker).await {
                        warn!("Failed to release reminder marker {}: {}", marker, release_error);
                    }
                }
                Err(e)
            }
        }
    }

    async fn deliver(
        &self,
        subscription: &ReminderSubscription,
        appointment: &AppointmentRecord,
    ) -> Result<(), ReminderError> {
        let doctor_name = self
            .within(self.dispatcher.doctor_display_name(&appointment.doctor_id))
            .await?;
        let notification = self
            .within(
                self.dispatcher
                    .send_reminder(&subscription.user_id, appointment, &doctor_name),
            )
            .await?;

        info!(
            "Reminder {} sent to user {} for appointment {}",
            notification.id, subscription.user_id, appointment.id
        );
        Ok(())
    }

    async fn within<T, E, F>(&self, operation: F) -> Result<T, ReminderError>
    where
        F: Future<Output = Result<T, E>>,
        ReminderError: From<E>,
    {
        match tokio::time::timeout(self.lookup_timeout, operation).await {
            Ok(result) => result.map_err(ReminderError::from),
            Err(_) => Err(StoreError::Timeout {
                timeout_ms: self.lookup_timeout.as_millis() as u64,
            }
            .into()),
        }
    }
}
