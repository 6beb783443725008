use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use shared_database::AppState;
use shared_models::{auth::User, error::AppError};
use shared_utils::extractor::require_operator;

use crate::{
    ReminderDispatcher, ReminderQuery, ReminderRegistry, ReminderScanner, SetReminderRequest,
    SweepReport,
};

/// Enable, re-time or disable the caller's reminder for one appointment.
pub async fn set_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<SetReminderRequest>,
) -> Result<Json<Value>, AppError> {
    let registry = ReminderRegistry::new(&state);
    let reminder = registry
        .set_reminder(&user.id, &appointment_id, request.enabled, request.lead_minutes)
        .await?;

    Ok(Json(json!({
        "success": true,
        "enabled": reminder.is_some(),
        "reminder": reminder
    })))
}

pub async fn list_reminders(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<ReminderQuery>,
) -> Result<Json<Value>, AppError> {
    let registry = ReminderRegistry::new(&state);
    let reminders = registry
        .get_reminders(&user.id, query.appointment_id.as_deref())
        .await?;

    Ok(Json(json!({
        "reminders": reminders,
        "total": reminders.len()
    })))
}

/// Entry point for an external scheduler.
pub async fn run_reminder_sweep(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<SweepReport>, AppError> {
    require_operator(&user)?;
    info!("Reminder sweep triggered by {}", user.id);

    let report = ReminderScanner::new(&state).sweep().await?;
    Ok(Json(report))
}

pub async fn send_manual_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden("Doctor role required".to_string()));
    }

    let dispatcher = ReminderDispatcher::new(&state);
    let notification = dispatcher
        .send_manual_reminder(&user.id, &appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "notification": notification
    })))
}
