use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use shared_database::{get_json, update_json, AppState, KeyValueStore};

use crate::{ReminderError, ReminderSubscription};

const REGISTRY_PREFIX: &str = "reminders:";

/// Longest accepted lead time: one week.
pub const MAX_LEAD_MINUTES: i64 = 7 * 24 * 60;

/// Each user's reminder subscriptions, stored as one list under `reminders:{user_id}`.
pub struct ReminderRegistry {
    store: Arc<dyn KeyValueStore>,
    max_retries: u32,
    default_lead_minutes: i64,
}

impl ReminderRegistry {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(
            state.store.clone(),
            state.config.store_max_retries,
            state.config.reminder_default_lead_minutes,
        )
    }

    pub fn with_store(store: Arc<dyn KeyValueStore>, max_retries: u32, default_lead_minutes: i64) -> Self {
        Self {
            store,
            max_retries,
            default_lead_minutes,
        }
    }

    pub fn registry_key(user_id: &str) -> String {
        format!("{}{}", REGISTRY_PREFIX, user_id)
    }

    /// Replaces any subscription for the pair. A disabled reminder is simply removed.
    #[instrument(skip(self))]
    pub async fn set_reminder(
        &self,
        user_id: &str,
        appointment_id: &str,
        enabled: bool,
        lead_minutes: Option<i64>,
    ) -> Result<Option<ReminderSubscription>, ReminderError> {
        if user_id.trim().is_empty() || appointment_id.trim().is_empty() {
            return Err(ReminderError::InvalidConfiguration(
                "User and appointment are required".to_string(),
            ));
        }

        let lead_minutes = lead_minutes.unwrap_or(self.default_lead_minutes);
        if !(1..=MAX_LEAD_MINUTES).contains(&lead_minutes) {
            return Err(ReminderError::InvalidConfiguration(format!(
                "Lead time must be between 1 and {} minutes, got {}",
                MAX_LEAD_MINUTES, lead_minutes
            )));
        }

        let subscription = enabled.then(|| ReminderSubscription {
            user_id: user_id.to_string(),
            appointment_id: appointment_id.to_string(),
            enabled: true,
            lead_minutes,
            updated_at: Utc::now(),
        });

        update_json(
            self.store.as_ref(),
            &Self::registry_key(user_id),
            self.max_retries,
            |subscriptions: &mut Vec<ReminderSubscription>| {
                subscriptions.retain(|existing| existing.appointment_id != appointment_id);
                if let Some(subscription) = &subscription {
                    subscriptions.push(subscription.clone());
                }
                Ok::<_, ReminderError>(())
            },
        )
        .await?;

        if enabled {
            info!("Reminder set for appointment {} ({} min lead)", appointment_id, lead_minutes);
        } else {
            info!("Reminder removed for appointment {}", appointment_id);
        }

        Ok(subscription)
    }

    pub async fn disable_reminder(&self, user_id: &str, appointment_id: &str) -> Result<(), ReminderError> {
        self.set_reminder(user_id, appointment_id, false, None).await?;
        Ok(())
    }

    pub async fn get_reminders(
        &self,
        user_id: &str,
        appointment_id: Option<&str>,
    ) -> Result<Vec<ReminderSubscription>, ReminderError> {
        let subscriptions = self.load_registry(&Self::registry_key(user_id)).await?;
        Ok(subscriptions
            .into_iter()
            .filter(|subscription| appointment_id.map_or(true, |id| subscription.appointment_id == id))
            .collect())
    }

    /// Every registry key across all users.
    pub async fn registry_keys(&self) -> Result<Vec<String>, ReminderError> {
        let keys = self.store.keys(&format!("{}*", REGISTRY_PREFIX)).await?;
        debug!("Found {} reminder registries", keys.len());
        Ok(keys)
    }

    pub async fn load_registry(&self, key: &str) -> Result<Vec<ReminderSubscription>, ReminderError> {
        Ok(get_json(self.store.as_ref(), key).await?.unwrap_or_default())
    }
}
