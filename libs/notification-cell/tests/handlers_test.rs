use axum::extract::{Extension, Path, State};
use assert_matches::assert_matches;
use uuid::Uuid;

use notification_cell::handlers::*;
use notification_cell::*;
use shared_models::error::AppError;
use shared_utils::test_utils::{test_state, TestUser};

#[tokio::test]
async fn test_doctor_reads_doctor_log() {
    let state = test_state();
    let doctor = TestUser::doctor().to_user();
    let service = NotificationService::new(&state);

    service
        .create_notification(NewNotification::new(
            NotificationType::Success,
            "New appointment booked",
            "09:30 on 2024-01-10",
            doctor.id.clone(),
            RecipientType::Doctor,
        ))
        .await
        .unwrap();

    let response = list_notifications(State(state.clone()), Extension(doctor.clone()))
        .await
        .expect("list should succeed");
    assert_eq!(response.0["total"], 1);

    let unread = get_unread_count(State(state), Extension(doctor)).await.unwrap();
    assert_eq!(unread.0.unread, 1);
}

#[tokio::test]
async fn test_mark_missing_notification_is_not_found() {
    let state = test_state();
    let patient = TestUser::patient().to_user();

    let result = mark_notification_read(State(state), Extension(patient), Path(Uuid::new_v4())).await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_own_notification() {
    let state = test_state();
    let patient = TestUser::patient().to_user();
    let created = NotificationService::new(&state)
        .create_notification(NewNotification::new(
            NotificationType::Warning,
            "Payment pending",
            "Complete payment to confirm",
            patient.id.clone(),
            RecipientType::User,
        ))
        .await
        .unwrap();

    let response = delete_notification(State(state.clone()), Extension(patient.clone()), Path(created.id))
        .await
        .unwrap();
    assert_eq!(response.0["success"], true);

    let listed = list_notifications(State(state), Extension(patient)).await.unwrap();
    assert_eq!(listed.0["total"], 0);
}
