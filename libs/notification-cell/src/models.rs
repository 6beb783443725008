use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Success,
    Warning,
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    User,
    Doctor,
}

impl fmt::Display for RecipientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipientType::User => write!(f, "user"),
            RecipientType::Doctor => write!(f, "doctor"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelatedType {
    Appointment,
    Slot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub recipient_id: String,
    pub recipient_type: RecipientType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_type: Option<RelatedType>,
}

/// Payload accepted by `NotificationService::create_notification`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub recipient_id: String,
    pub recipient_type: RecipientType,
    pub related_id: Option<String>,
    pub related_type: Option<RelatedType>,
}

impl NewNotification {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        recipient_id: impl Into<String>,
        recipient_type: RecipientType,
    ) -> Self {
        Self {
            notification_type,
            title: title.into(),
            message: message.into(),
            recipient_id: recipient_id.into(),
            recipient_type,
            related_id: None,
            related_type: None,
        }
    }

    pub fn related_to(mut self, related_type: RelatedType, related_id: impl Into<String>) -> Self {
        self.related_type = Some(related_type);
        self.related_id = Some(related_id.into());
        self
    }

    pub fn into_notification(self, timestamp: DateTime<Utc>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            notification_type: self.notification_type,
            title: self.title,
            message: self.message,
            timestamp,
            read: false,
            recipient_id: self.recipient_id,
            recipient_type: self.recipient_type,
            related_id: self.related_id,
            related_type: self.related_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread: usize,
}
