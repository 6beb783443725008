use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_database::{get_json, update_json, AppState, KeyValueStore};

use crate::{NewNotification, Notification, NotificationError, RecipientType};

/// Per-recipient notification log, newest first and capped.
///
/// Every write goes through a versioned read-modify-write, so concurrent producers
/// addressing the same recipient never drop each other's entries.
pub struct NotificationService {
    store: Arc<dyn KeyValueStore>,
    log_cap: usize,
    max_retries: u32,
}

impl NotificationService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(
            state.store.clone(),
            state.config.notification_log_cap,
            state.config.store_max_retries,
        )
    }

    pub fn with_store(store: Arc<dyn KeyValueStore>, log_cap: usize, max_retries: u32) -> Self {
        Self {
            store,
            log_cap: log_cap.max(1),
            max_retries,
        }
    }

    pub fn log_key(recipient_type: RecipientType, recipient_id: &str) -> String {
        format!("notifications:{}:{}", recipient_type, recipient_id)
    }

    #[instrument(skip(self, payload), fields(recipient = %payload.recipient_id))]
    pub async fn create_notification(
        &self,
        payload: NewNotification,
    ) -> Result<Notification, NotificationError> {
        if payload.recipient_id.trim().is_empty() {
            return Err(NotificationError::InvalidPayload("Recipient is required".to_string()));
        }
        if payload.title.trim().is_empty() {
            return Err(NotificationError::InvalidPayload("Title is required".to_string()));
        }

        let key = Self::log_key(payload.recipient_type, &payload.recipient_id);
        let notification = payload.into_notification(Utc::now());
        let log_cap = self.log_cap;

        let dropped = update_json(
            self.store.as_ref(),
            &key,
            self.max_retries,
            |log: &mut Vec<Notification>| {
                log.insert(0, notification.clone());
                sort_newest_first(log);
                let dropped = log.len().saturating_sub(log_cap);
                log.truncate(log_cap);
                Ok::<_, NotificationError>(dropped)
            },
        )
        .await?;

        if dropped > 0 {
            debug!("Dropped {} oldest notifications from {}", dropped, key);
        }
        info!("Notification {} created for {}", notification.id, key);

        Ok(notification)
    }

    pub async fn get_notifications(
        &self,
        recipient_id: &str,
        recipient_type: RecipientType,
    ) -> Result<Vec<Notification>, NotificationError> {
        let key = Self::log_key(recipient_type, recipient_id);
        let mut log: Vec<Notification> = get_json(self.store.as_ref(), &key)
            .await?
            .unwrap_or_default();
        sort_newest_first(&mut log);
        Ok(log)
    }

    pub async fn unread_count(
        &self,
        recipient_id: &str,
        recipient_type: RecipientType,
    ) -> Result<usize, NotificationError> {
        let log = self.get_notifications(recipient_id, recipient_type).await?;
        Ok(log.iter().filter(|notification| !notification.read).count())
    }

    /// Returns `false` when no such notification exists in the recipient's log.
    pub async fn mark_as_read(
        &self,
        recipient_id: &str,
        recipient_type: RecipientType,
        notification_id: Uuid,
    ) -> Result<bool, NotificationError> {
        let key = Self::log_key(recipient_type, recipient_id);
        let marked = update_json(
            self.store.as_ref(),
            &key,
            self.max_retries,
            |log: &mut Vec<Notification>| {
                let notification = log
                    .iter_mut()
                    .find(|notification| notification.id == notification_id)
                    .ok_or(NotificationError::NotFound(notification_id))?;
                notification.read = true;
                Ok::<_, NotificationError>(())
            },
        )
        .await;

        found_or_false(marked)
    }

    /// Returns how many notifications changed from unread to read.
    pub async fn mark_all_as_read(
        &self,
        recipient_id: &str,
        recipient_type: RecipientType,
    ) -> Result<usize, NotificationError> {
        let log = self.get_notifications(recipient_id, recipient_type).await?;
        if log.iter().all(|notification| notification.read) {
            return Ok(0);
        }

        let key = Self::log_key(recipient_type, recipient_id);
        update_json(
            self.store.as_ref(),
            &key,
            self.max_retries,
            |log: &mut Vec<Notification>| {
                let mut changed = 0;
                for notification in log.iter_mut().filter(|notification| !notification.read) {
                    notification.read = true;
                    changed += 1;
                }
                Ok::<_, NotificationError>(changed)
            },
        )
        .await
    }

    pub async fn delete_notification(
        &self,
        recipient_id: &str,
        recipient_type: RecipientType,
        notification_id: Uuid,
    ) -> Result<bool, NotificationError> {
        let key = Self::log_key(recipient_type, recipient_id);
        let deleted = update_json(
            self.store.as_ref(),
            &key,
            self.max_retries,
            |log: &mut Vec<Notification>| {
                let index = log
                    .iter()
                    .position(|notification| notification.id == notification_id)
                    .ok_or(NotificationError::NotFound(notification_id))?;
                log.remove(index);
                Ok::<_, NotificationError>(())
            },
        )
        .await;

        found_or_false(deleted)
    }
}

// A missing id aborts the update before anything is written.
fn found_or_false(result: Result<(), NotificationError>) -> Result<bool, NotificationError> {
    match result {
        Ok(()) => Ok(true),
        Err(NotificationError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

// Stable, so entries sharing a timestamp keep their prepend order.
fn sort_newest_first(log: &mut [Notification]) {
    log.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
