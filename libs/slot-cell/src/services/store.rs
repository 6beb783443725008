use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_database::{get_json, update_json, AppState, KeyValueStore};

use crate::{AppointmentSlot, CreateSlotRequest, SlotError, SlotTime, UpdateSlotRequest};

/// Owns each doctor's slot list under `slots:{doctor_id}`.
///
/// All mutations run as a versioned read-modify-write of the whole list, so two callers
/// racing for the same time point cannot both succeed.
pub struct SlotStoreService {
    store: Arc<dyn KeyValueStore>,
    max_retries: u32,
}

impl SlotStoreService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(state.store.clone(), state.config.store_max_retries)
    }

    pub fn with_store(store: Arc<dyn KeyValueStore>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    pub fn slots_key(doctor_id: &str) -> String {
        format!("slots:{}", doctor_id)
    }

    pub async fn list_slots(
        &self,
        doctor_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AppointmentSlot>, SlotError> {
        let slots: Vec<AppointmentSlot> = get_json(self.store.as_ref(), &Self::slots_key(doctor_id))
            .await?
            .unwrap_or_default();

        let mut slots: Vec<AppointmentSlot> = slots
            .into_iter()
            .filter(|slot| date.map_or(true, |date| slot.date == date))
            .collect();
        slots.sort_by_key(|slot| (slot.date, slot.start_time));
        Ok(slots)
    }

    pub async fn get_slot(&self, doctor_id: &str, slot_id: Uuid) -> Result<AppointmentSlot, SlotError> {
        self.list_slots(doctor_id, None)
            .await?
            .into_iter()
            .find(|slot| slot.id == slot_id)
            .ok_or_else(|| SlotError::NotFound(format!("Slot {} not found", slot_id)))
    }

    /// Adds a slot, or one slot per week when the definition is recurring.
    #[instrument(skip(self, request))]
    pub async fn add_slot(
        &self,
        doctor_id: &str,
        request: CreateSlotRequest,
    ) -> Result<Vec<AppointmentSlot>, SlotError> {
        let now = Utc::now();
        let weeks = if request.is_recurring {
            request.recurring_weeks.unwrap_or(0)
        } else {
            1
        };
        if weeks == 0 {
            return Err(SlotError::InvalidConfiguration(
                "Recurring slots require recurring_weeks of at least 1".to_string(),
            ));
        }

        let created = (0..weeks)
            .map(|week| {
                let date = request.date + Duration::weeks(i64::from(week));
                AppointmentSlot::from_request(doctor_id, date, &request, now)
            })
            .collect::<Result<Vec<_>, _>>()?;

        update_json(
            self.store.as_ref(),
            &Self::slots_key(doctor_id),
            self.max_retries,
            |slots: &mut Vec<AppointmentSlot>| {
                slots.extend(created.iter().cloned());
                Ok::<_, SlotError>(())
            },
        )
        .await?;

        info!("Added {} slot(s) for doctor {}", created.len(), doctor_id);
        Ok(created)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_slot(
        &self,
        doctor_id: &str,
        slot_id: Uuid,
        patch: UpdateSlotRequest,
    ) -> Result<AppointmentSlot, SlotError> {
        let now = Utc::now();

        update_json(
            self.store.as_ref(),
            &Self::slots_key(doctor_id),
            self.max_retries,
            |slots: &mut Vec<AppointmentSlot>| {
                let slot = slots
                    .iter_mut()
                    .find(|slot| slot.id == slot_id)
                    .ok_or_else(|| SlotError::NotFound(format!("Slot {} not found", slot_id)))?;
                slot.apply_patch(patch.clone(), now)?;
                Ok::<_, SlotError>(slot.clone())
            },
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn remove_slot(&self, doctor_id: &str, slot_id: Uuid) -> Result<AppointmentSlot, SlotError> {
        let removed = update_json(
            self.store.as_ref(),
            &Self::slots_key(doctor_id),
            self.max_retries,
            |slots: &mut Vec<AppointmentSlot>| {
                let index = slots
                    .iter()
                    .position(|slot| slot.id == slot_id)
                    .ok_or_else(|| SlotError::NotFound(format!("Slot {} not found", slot_id)))?;
                Ok::<_, SlotError>(slots.remove(index))
            },
        )
        .await?;

        info!("Removed slot {} for doctor {}", slot_id, doctor_id);
        Ok(removed)
    }

    #[instrument(skip(self), fields(time = %time))]
    pub async fn book_slot(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        time: SlotTime,
    ) -> Result<AppointmentSlot, SlotError> {
        let now = Utc::now();

        let slot = update_json(
            self.store.as_ref(),
            &Self::slots_key(doctor_id),
            self.max_retries,
            |slots: &mut Vec<AppointmentSlot>| {
                let slot = locate(slots, doctor_id, date, time)?;
                slot.book(time, now)?;
                Ok::<_, SlotError>(slot.clone())
            },
        )
        .await?;

        info!("Booked {} on {} with doctor {}", time, date, doctor_id);
        Ok(slot)
    }

    /// Idempotent: cancelling a time that is not booked succeeds without change.
    #[instrument(skip(self), fields(time = %time))]
    pub async fn cancel_slot(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        time: SlotTime,
    ) -> Result<AppointmentSlot, SlotError> {
        let now = Utc::now();

        let (slot, released) = update_json(
            self.store.as_ref(),
            &Self::slots_key(doctor_id),
            self.max_retries,
            |slots: &mut Vec<AppointmentSlot>| {
                let slot = locate(slots, doctor_id, date, time)?;
                let released = slot.cancel(time, now)?;
                Ok::<_, SlotError>((slot.clone(), released))
            },
        )
        .await?;

        if released {
            info!("Cancelled {} on {} with doctor {}", time, date, doctor_id);
        } else {
            debug!("Nothing booked at {} on {} with doctor {}", time, date, doctor_id);
        }
        Ok(slot)
    }
}

/// Picks the slot on `date` whose grid contains `time`.
fn locate<'a>(
    slots: &'a mut [AppointmentSlot],
    doctor_id: &str,
    date: NaiveDate,
    time: SlotTime,
) -> Result<&'a mut AppointmentSlot, SlotError> {
    let mut on_date = slots.iter_mut().filter(|slot| slot.date == date).peekable();
    if on_date.peek().is_none() {
        return Err(SlotError::NotFound(format!(
            "Doctor {} has no slot on {}",
            doctor_id, date
        )));
    }

    on_date
        .find(|slot| slot.offers(time))
        .ok_or_else(|| SlotError::NotFound(format!("{} is not offered on {}", time, date)))
}
