use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::AppError;

use crate::SlotTime;

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Invalid slot configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Time {0} is already booked")]
    AlreadyBooked(SlotTime),

    #[error("Slot store error: {0}")]
    TransientStore(#[from] StoreError),
}

impl From<SlotError> for AppError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::InvalidConfiguration(msg) => AppError::ValidationError(msg),
            SlotError::NotFound(msg) => AppError::NotFound(msg),
            SlotError::AlreadyBooked(time) => {
                AppError::Conflict(format!("Time {} is already booked", time))
            }
            SlotError::TransientStore(e) => AppError::ServiceUnavailable(e.to_string()),
        }
    }
}
