use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;

use shared_database::{InMemoryStore, KeyValueStore};
use slot_cell::*;

const DOCTOR: &str = "doctor-1";

fn t(raw: &str) -> SlotTime {
    raw.parse().expect("valid time")
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

fn service() -> SlotStoreService {
    SlotStoreService::with_store(Arc::new(InMemoryStore::new()), 5)
}

fn stream_request(start: &str, end: &str, duration: i64) -> CreateSlotRequest {
    CreateSlotRequest {
        date: date(),
        start_time: t(start),
        end_time: t(end),
        slot_duration: duration,
        slot_type: SlotType::Stream,
        max_patients: None,
        booked_slots: Default::default(),
        is_recurring: false,
        recurring_weeks: None,
    }
}

#[tokio::test]
async fn test_add_slot_computes_availability() {
    let service = service();
    let mut request = stream_request("09:00", "10:00", 15);
    request.booked_slots = [t("09:30")].into_iter().collect();

    let created = service.add_slot(DOCTOR, request).await.expect("slot should be created");
    assert_eq!(created.len(), 1);
    assert_eq!(
        created[0].available_slots(),
        &[t("09:00"), t("09:15"), t("09:45")]
    );

    let listed = service.list_slots(DOCTOR, Some(date())).await.unwrap();
    assert_eq!(listed, created);
}

#[tokio::test]
async fn test_add_slot_rejects_bad_definitions() {
    let service = service();

    assert_matches!(
        service.add_slot(DOCTOR, stream_request("10:00", "09:00", 15)).await,
        Err(SlotError::InvalidConfiguration(_))
    );
    assert_matches!(
        service.add_slot(DOCTOR, stream_request("09:00", "10:00", 0)).await,
        Err(SlotError::InvalidConfiguration(_))
    );

    let mut wave = stream_request("09:00", "10:00", 30);
    wave.slot_type = SlotType::Wave;
    assert_matches!(
        service.add_slot(DOCTOR, wave).await,
        Err(SlotError::InvalidConfiguration(_))
    );

    assert!(service.list_slots(DOCTOR, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_recurring_slot_creates_weekly_copies() {
    let service = service();
    let mut request = stream_request("09:00", "10:00", 30);
    request.is_recurring = true;
    request.recurring_weeks = Some(3);

    let created = service.add_slot(DOCTOR, request).await.unwrap();
    let dates: Vec<NaiveDate> = created.iter().map(|slot| slot.date).collect();
    assert_eq!(
        dates,
        vec![
            date(),
            NaiveDate::from_ymd_opt(2024, 1, 17).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 24).unwrap(),
        ]
    );
    assert_ne!(created[0].id, created[1].id);
}

#[tokio::test]
async fn test_book_then_cancel_round_trip() {
    let service = service();
    let created = service.add_slot(DOCTOR, stream_request("09:00", "10:00", 15)).await.unwrap();
    let before = created[0].available_slots().to_vec();

    let booked = service.book_slot(DOCTOR, date(), t("09:15")).await.unwrap();
    assert!(booked.booked_slots().contains(&t("09:15")));
    assert!(!booked.available_slots().contains(&t("09:15")));

    let cancelled = service.cancel_slot(DOCTOR, date(), t("09:15")).await.unwrap();
    assert_eq!(cancelled.available_slots(), before.as_slice());
    assert!(cancelled.booked_slots().is_empty());
}

#[tokio::test]
async fn test_double_booking_is_rejected_without_change() {
    let service = service();
    service.add_slot(DOCTOR, stream_request("09:00", "10:00", 15)).await.unwrap();
    let booked = service.book_slot(DOCTOR, date(), t("09:30")).await.unwrap();

    let result = service.book_slot(DOCTOR, date(), t("09:30")).await;
    assert_matches!(result, Err(SlotError::AlreadyBooked(time)) if time == t("09:30"));

    let stored = service.get_slot(DOCTOR, booked.id).await.unwrap();
    assert_eq!(stored.booked_slots(), booked.booked_slots());
    assert_eq!(stored.available_slots(), booked.available_slots());
}

#[tokio::test]
async fn test_booking_unknown_date_or_time_is_not_found() {
    let service = service();
    service.add_slot(DOCTOR, stream_request("09:00", "10:00", 15)).await.unwrap();

    let other_day = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
    assert_matches!(
        service.book_slot(DOCTOR, other_day, t("09:00")).await,
        Err(SlotError::NotFound(_))
    );
    assert_matches!(
        service.book_slot(DOCTOR, date(), t("09:10")).await,
        Err(SlotError::NotFound(_))
    );
}

#[tokio::test]
async fn test_cancel_unbooked_time_is_noop() {
    let service = service();
    let created = service.add_slot(DOCTOR, stream_request("09:00", "10:00", 15)).await.unwrap();

    let slot = service.cancel_slot(DOCTOR, date(), t("09:45")).await.unwrap();
    assert_eq!(slot.available_slots(), created[0].available_slots());
    assert_eq!(slot.updated_at, created[0].updated_at);
}

#[tokio::test]
async fn test_booking_picks_slot_whose_grid_contains_time() {
    let service = service();
    service.add_slot(DOCTOR, stream_request("09:00", "10:00", 30)).await.unwrap();
    let afternoon = service.add_slot(DOCTOR, stream_request("14:00", "15:00", 30)).await.unwrap();

    let booked = service.book_slot(DOCTOR, date(), t("14:30")).await.unwrap();
    assert_eq!(booked.id, afternoon[0].id);
}

#[tokio::test]
async fn test_wave_slot_fills_up_to_capacity() {
    let service = service();
    let mut request = stream_request("09:00", "10:00", 30);
    request.slot_type = SlotType::Wave;
    request.max_patients = Some(2);
    service.add_slot(DOCTOR, request).await.unwrap();

    let first = service.book_slot(DOCTOR, date(), t("09:00")).await.unwrap();
    assert_eq!(first.bookings_at(t("09:00")), 1);
    assert!(first.available_slots().contains(&t("09:00")));

    let second = service.book_slot(DOCTOR, date(), t("09:00")).await.unwrap();
    assert!(second.booked_slots().contains(&t("09:00")));
    assert!(!second.available_slots().contains(&t("09:00")));

    assert_matches!(
        service.book_slot(DOCTOR, date(), t("09:00")).await,
        Err(SlotError::AlreadyBooked(_))
    );

    let reopened = service.cancel_slot(DOCTOR, date(), t("09:00")).await.unwrap();
    assert_eq!(reopened.bookings_at(t("09:00")), 1);
    assert!(reopened.available_slots().contains(&t("09:00")));
}

#[tokio::test]
async fn test_update_slot_recomputes_availability() {
    let service = service();
    let created = service.add_slot(DOCTOR, stream_request("09:00", "10:00", 30)).await.unwrap();

    let updated = service
        .update_slot(
            DOCTOR,
            created[0].id,
            UpdateSlotRequest {
                end_time: Some(t("11:00")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        updated.available_slots(),
        &[t("09:00"), t("09:30"), t("10:00"), t("10:30")]
    );
}

#[tokio::test]
async fn test_update_slot_cannot_orphan_bookings() {
    let service = service();
    let created = service.add_slot(DOCTOR, stream_request("09:00", "10:00", 30)).await.unwrap();
    service.book_slot(DOCTOR, date(), t("09:30")).await.unwrap();

    let result = service
        .update_slot(
            DOCTOR,
            created[0].id,
            UpdateSlotRequest {
                slot_duration: Some(20),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(result, Err(SlotError::InvalidConfiguration(_)));

    let stored = service.get_slot(DOCTOR, created[0].id).await.unwrap();
    assert_eq!(stored.slot_duration, 30);
    assert!(stored.booked_slots().contains(&t("09:30")));
}

#[tokio::test]
async fn test_remove_slot() {
    let service = service();
    let created = service.add_slot(DOCTOR, stream_request("09:00", "10:00", 30)).await.unwrap();

    service.remove_slot(DOCTOR, created[0].id).await.unwrap();
    assert_matches!(
        service.remove_slot(DOCTOR, created[0].id).await,
        Err(SlotError::NotFound(_))
    );
}

#[tokio::test]
async fn test_concurrent_bookings_for_same_time_admit_one() {
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
    let service = Arc::new(SlotStoreService::with_store(store, 50));
    service.add_slot(DOCTOR, stream_request("09:00", "10:00", 15)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.book_slot(DOCTOR, date(), t("09:45")).await
        }));
    }

    let mut succeeded = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(SlotError::AlreadyBooked(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(conflicts, 7);
}
