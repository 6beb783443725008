use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use notification_cell::{
    NewNotification, NotificationService, NotificationType, RecipientType, RelatedType,
};
use shared_database::AppState;
use shared_models::{auth::User, error::AppError};
use shared_utils::extractor::require_doctor;

use crate::{
    AppointmentSlot, BookSlotRequest, CreateSlotRequest, SlotListQuery, SlotStoreService,
    UpdateSlotRequest,
};

// ==============================================================================
// DOCTOR SCHEDULE MANAGEMENT
// ==============================================================================

pub async fn create_slots(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<String>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user, &doctor_id)?;

    let service = SlotStoreService::new(&state);
    let slots = service.add_slot(&doctor_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "slots": slots
    })))
}

pub async fn update_slot(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((doctor_id, slot_id)): Path<(String, Uuid)>,
    Json(patch): Json<UpdateSlotRequest>,
) -> Result<Json<AppointmentSlot>, AppError> {
    require_doctor(&user, &doctor_id)?;

    let service = SlotStoreService::new(&state);
    let slot = service.update_slot(&doctor_id, slot_id, patch).await?;

    Ok(Json(slot))
}

pub async fn delete_slot(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((doctor_id, slot_id)): Path<(String, Uuid)>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user, &doctor_id)?;

    let service = SlotStoreService::new(&state);
    service.remove_slot(&doctor_id, slot_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Slot deleted"
    })))
}

// ==============================================================================
// BOOKING SURFACE
// ==============================================================================

pub async fn list_slots(
    State(state): State<AppState>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SlotStoreService::new(&state);
    let slots = service.list_slots(&doctor_id, query.date).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "slots": slots,
        "total": slots.len()
    })))
}

pub async fn book_slot(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<String>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<AppointmentSlot>, AppError> {
    info!("Booking request from user {} for doctor {}", user.id, doctor_id);

    let service = SlotStoreService::new(&state);
    let slot = service.book_slot(&doctor_id, request.date, request.time).await?;

    // Best effort: the booking already stands.
    let notice = NewNotification::new(
        NotificationType::Success,
        "New appointment booked",
        format!("A patient booked {} on {}", request.time, request.date),
        doctor_id.clone(),
        RecipientType::Doctor,
    )
    .related_to(RelatedType::Slot, slot.id.to_string());

    if let Err(e) = NotificationService::new(&state).create_notification(notice).await {
        warn!("Failed to notify doctor {} of booking: {}", doctor_id, e);
    }

    Ok(Json(slot))
}

pub async fn cancel_slot(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<String>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<AppointmentSlot>, AppError> {
    info!("Cancellation request from user {} for doctor {}", user.id, doctor_id);

    let service = SlotStoreService::new(&state);
    let slot = service.cancel_slot(&doctor_id, request.date, request.time).await?;

    Ok(Json(slot))
}
