use thiserror::Error;

use notification_cell::NotificationError;
use shared_database::StoreError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Invalid reminder configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Malformed appointment record: {0}")]
    MalformedAppointment(String),

    #[error("Reminder store error: {0}")]
    TransientStore(#[from] StoreError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),
}

impl ReminderError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ReminderError::TransientStore(StoreError::Timeout { .. })
                | ReminderError::Notification(NotificationError::TransientStore(StoreError::Timeout { .. }))
        )
    }
}

impl From<ReminderError> for AppError {
    fn from(err: ReminderError) -> Self {
        match err {
            ReminderError::InvalidConfiguration(msg) => AppError::ValidationError(msg),
            ReminderError::NotFound(msg) => AppError::NotFound(msg),
            ReminderError::Unauthorized(msg) => AppError::Forbidden(msg),
            ReminderError::MalformedAppointment(msg) => AppError::Internal(msg),
            ReminderError::TransientStore(e) => AppError::ServiceUnavailable(e.to_string()),
            ReminderError::Notification(e) => e.into(),
        }
    }
}
