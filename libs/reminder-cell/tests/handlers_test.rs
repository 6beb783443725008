use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use assert_matches::assert_matches;

use reminder_cell::handlers::*;
use reminder_cell::*;
use shared_database::set_json;
use shared_models::error::AppError;
use shared_utils::test_utils::{test_state, TestUser};

async fn seed_appointment(state: &shared_database::AppState, doctor_id: &str, patient_id: &str) {
    let record = AppointmentRecord {
        id: "appt-1".to_string(),
        doctor_id: doctor_id.to_string(),
        patient_id: patient_id.to_string(),
        date: "2024-01-10".to_string(),
        time: "10:00".to_string(),
        status: AppointmentStatus::Confirmed,
    };
    set_json(state.store.as_ref(), &ReminderDispatcher::appointment_key("appt-1"), &record, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_patient_sets_and_lists_reminder() {
    let state = test_state();
    let patient = TestUser::patient().to_user();

    let set = set_reminder(
        State(state.clone()),
        Extension(patient.clone()),
        Path("appt-1".to_string()),
        Json(SetReminderRequest { enabled: true, lead_minutes: Some(45) }),
    )
    .await
    .unwrap();
    assert_eq!(set.0["success"], true);
    assert_eq!(set.0["reminder"]["lead_minutes"], 45);

    let listed = list_reminders(
        State(state.clone()),
        Extension(patient.clone()),
        Query(ReminderQuery { appointment_id: None }),
    )
    .await
    .unwrap();
    assert_eq!(listed.0["total"], 1);

    let invalid = set_reminder(
        State(state.clone()),
        Extension(patient),
        Path("appt-1".to_string()),
        Json(SetReminderRequest { enabled: true, lead_minutes: Some(0) }),
    )
    .await;
    assert_matches!(invalid, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_manual_reminder_reaches_patient() {
    let state = test_state();
    let doctor = TestUser::doctor().to_user();
    let patient = TestUser::patient().to_user();
    seed_appointment(&state, &doctor.id, &patient.id).await;

    let sent = send_manual_reminder(
        State(state.clone()),
        Extension(doctor),
        Path("appt-1".to_string()),
    )
    .await
    .unwrap();

    assert_eq!(sent.0["success"], true);
    assert_eq!(sent.0["notification"]["recipient_id"], patient.id.as_str());
}

#[tokio::test]
async fn test_manual_reminder_requires_owning_doctor() {
    let state = test_state();
    let owner = TestUser::doctor().to_user();
    let other = TestUser::doctor().to_user();
    let patient = TestUser::patient().to_user();
    seed_appointment(&state, &owner.id, &patient.id).await;

    let result = send_manual_reminder(
        State(state.clone()),
        Extension(other),
        Path("appt-1".to_string()),
    )
    .await;
    assert_matches!(result, Err(AppError::Forbidden(_)));

    let result = send_manual_reminder(
        State(state.clone()),
        Extension(patient),
        Path("appt-1".to_string()),
    )
    .await;
    assert_matches!(result, Err(AppError::Forbidden(_)));

    let result = send_manual_reminder(
        State(state),
        Extension(owner),
        Path("missing".to_string()),
    )
    .await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn test_sweep_endpoint_is_operator_only() {
    let state = test_state();

    let result = run_reminder_sweep(State(state.clone()), Extension(TestUser::patient().to_user())).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));

    let report = run_reminder_sweep(State(state), Extension(TestUser::admin().to_user()))
        .await
        .unwrap();
    assert_eq!(report.0.total_reminders, 0);
}
