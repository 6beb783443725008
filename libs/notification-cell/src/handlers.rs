use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_database::AppState;
use shared_models::{auth::User, error::AppError};

use crate::{NotificationService, RecipientType, UnreadCount};

/// Doctors read the doctor log; everyone else reads their user log.
pub fn recipient_type_for(user: &User) -> RecipientType {
    if user.is_doctor() {
        RecipientType::Doctor
    } else {
        RecipientType::User
    }
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);
    let notifications = service
        .get_notifications(&user.id, recipient_type_for(&user))
        .await?;

    Ok(Json(json!({
        "notifications": notifications,
        "total": notifications.len()
    })))
}

pub async fn get_unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<UnreadCount>, AppError> {
    let service = NotificationService::new(&state);
    let unread = service.unread_count(&user.id, recipient_type_for(&user)).await?;

    Ok(Json(UnreadCount { unread }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);
    let found = service
        .mark_as_read(&user.id, recipient_type_for(&user), notification_id)
        .await?;

    if !found {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    Ok(Json(json!({ "success": true })))
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);
    let updated = service
        .mark_all_as_read(&user.id, recipient_type_for(&user))
        .await?;

    info!("Marked {} notifications read for user {}", updated, user.id);

    Ok(Json(json!({ "success": true, "updated": updated })))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);
    let deleted = service
        .delete_notification(&user.id, recipient_type_for(&user), notification_id)
        .await?;

    if !deleted {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    Ok(Json(json!({ "success": true })))
}
