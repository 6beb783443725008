use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Invalid notification: {0}")]
    InvalidPayload(String),

    #[error("Notification {0} not found")]
    NotFound(Uuid),

    #[error("Notification store error: {0}")]
    TransientStore(#[from] StoreError),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::InvalidPayload(msg) => AppError::ValidationError(msg),
            NotificationError::NotFound(id) => AppError::NotFound(format!("Notification {} not found", id)),
            NotificationError::TransientStore(e) => AppError::ServiceUnavailable(e.to_string()),
        }
    }
}
