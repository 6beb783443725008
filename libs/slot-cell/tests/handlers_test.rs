use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use assert_matches::assert_matches;
use chrono::NaiveDate;

use notification_cell::{NotificationService, RecipientType};
use shared_models::error::AppError;
use shared_utils::test_utils::{test_state, TestUser};
use slot_cell::handlers::*;
use slot_cell::*;

fn t(raw: &str) -> SlotTime {
    raw.parse().expect("valid time")
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

fn morning_request() -> CreateSlotRequest {
    CreateSlotRequest {
        date: date(),
        start_time: t("09:00"),
        end_time: t("10:00"),
        slot_duration: 15,
        slot_type: SlotType::Stream,
        max_patients: None,
        booked_slots: Default::default(),
        is_recurring: false,
        recurring_weeks: None,
    }
}

#[tokio::test]
async fn test_doctor_creates_and_patient_books() {
    let state = test_state();
    let doctor = TestUser::doctor().to_user();
    let patient = TestUser::patient().to_user();

    let created = create_slots(
        State(state.clone()),
        Extension(doctor.clone()),
        Path(doctor.id.clone()),
        Json(morning_request()),
    )
    .await
    .expect("doctor should create own slots");
    assert_eq!(created.0["success"], true);

    let booked = book_slot(
        State(state.clone()),
        Extension(patient.clone()),
        Path(doctor.id.clone()),
        Json(BookSlotRequest { date: date(), time: t("09:15") }),
    )
    .await
    .expect("booking should succeed");
    assert!(booked.0.booked_slots().contains(&t("09:15")));

    let listed = list_slots(
        State(state.clone()),
        Path(doctor.id.clone()),
        Query(SlotListQuery { date: Some(date()) }),
    )
    .await
    .unwrap();
    assert_eq!(listed.0["total"], 1);
    assert_eq!(listed.0["slots"][0]["available_slots"], serde_json::json!(["09:00", "09:30", "09:45"]));

    let notices = NotificationService::new(&state)
        .get_notifications(&doctor.id, RecipientType::Doctor)
        .await
        .unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "New appointment booked");
}

#[tokio::test]
async fn test_double_booking_surfaces_conflict() {
    let state = test_state();
    let doctor = TestUser::doctor().to_user();
    let patient = TestUser::patient().to_user();

    SlotStoreService::new(&state)
        .add_slot(&doctor.id, morning_request())
        .await
        .unwrap();

    let request = BookSlotRequest { date: date(), time: t("09:30") };
    book_slot(
        State(state.clone()),
        Extension(patient.clone()),
        Path(doctor.id.clone()),
        Json(request.clone()),
    )
    .await
    .unwrap();

    let result = book_slot(State(state), Extension(patient), Path(doctor.id), Json(request)).await;
    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn test_only_owning_doctor_manages_slots() {
    let state = test_state();
    let owner = TestUser::doctor().to_user();
    let other_doctor = TestUser::doctor().to_user();
    let patient = TestUser::patient().to_user();

    let result = create_slots(
        State(state.clone()),
        Extension(other_doctor),
        Path(owner.id.clone()),
        Json(morning_request()),
    )
    .await;
    assert_matches!(result, Err(AppError::Forbidden(_)));

    let result = create_slots(
        State(state),
        Extension(patient.clone()),
        Path(patient.id.clone()),
        Json(morning_request()),
    )
    .await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_invalid_definition_is_validation_error() {
    let state = test_state();
    let doctor = TestUser::doctor().to_user();
    let mut request = morning_request();
    request.slot_duration = 0;

    let result = create_slots(
        State(state),
        Extension(doctor.clone()),
        Path(doctor.id.clone()),
        Json(request),
    )
    .await;
    assert_matches!(result, Err(AppError::ValidationError(_)));
}
