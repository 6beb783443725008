use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use crate::services::generator::generate_slots;
use crate::SlotError;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid time of day: {0}")]
pub struct InvalidSlotTime(pub String);

/// Time of day at minute precision, written as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(SlotTime)
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        if minutes >= MINUTES_PER_DAY {
            return None;
        }
        Self::new(minutes / 60, minutes % 60)
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }
}

/// Accepts `HH:MM`, or `HH:MM:SS` with zero seconds.
impl FromStr for SlotTime {
    type Err = InvalidSlotTime;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .ok()
            .filter(|time| time.second() == 0 && time.nanosecond() == 0)
            .map(SlotTime)
            .ok_or_else(|| InvalidSlotTime(raw.to_string()))
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    /// Several patients share each time point, up to `max_patients`.
    Wave,
    /// One patient per time point.
    Stream,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentSlot {
    pub id: Uuid,
    pub doctor_id: String,
    pub date: NaiveDate,
    pub start_time: SlotTime,
    pub end_time: SlotTime,
    pub slot_duration: i64,
    pub slot_type: SlotType,
    pub max_patients: Option<u32>,
    booked_slots: BTreeSet<SlotTime>,
    #[serde(default)]
    wave_bookings: BTreeMap<SlotTime, u32>,
    available_slots: Vec<SlotTime>,
    pub is_recurring: bool,
    pub recurring_weeks: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentSlot {
    /// Builds a validated slot with its availability already computed.
    pub fn from_request(
        doctor_id: &str,
        date: NaiveDate,
        request: &CreateSlotRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, SlotError> {
        let mut slot = Self {
            id: Uuid::new_v4(),
            doctor_id: doctor_id.to_string(),
            date,
            start_time: request.start_time,
            end_time: request.end_time,
            slot_duration: request.slot_duration,
            slot_type: request.slot_type,
            max_patients: request.max_patients,
            booked_slots: BTreeSet::new(),
            wave_bookings: BTreeMap::new(),
            available_slots: Vec::new(),
            is_recurring: request.is_recurring,
            recurring_weeks: request.recurring_weeks,
            created_at: now,
            updated_at: now,
        };

        slot.validate_definition()?;
        slot.replace_booked(request.booked_slots.clone());
        slot.refresh_availability()?;
        Ok(slot)
    }

    pub fn booked_slots(&self) -> &BTreeSet<SlotTime> {
        &self.booked_slots
    }

    pub fn available_slots(&self) -> &[SlotTime] {
        &self.available_slots
    }

    /// Patients booked at `time`; for stream slots this is 0 or 1.
    pub fn bookings_at(&self, time: SlotTime) -> u32 {
        match self.slot_type {
            SlotType::Wave => self.wave_bookings.get(&time).copied().unwrap_or(0),
            SlotType::Stream => u32::from(self.booked_slots.contains(&time)),
        }
    }

    pub fn capacity(&self) -> u32 {
        match self.slot_type {
            SlotType::Wave => self.max_patients.unwrap_or(1).max(1),
            SlotType::Stream => 1,
        }
    }

    pub fn grid(&self) -> Result<Vec<SlotTime>, SlotError> {
        generate_slots(self.start_time, self.end_time, self.slot_duration, &BTreeSet::new())
    }

    pub fn offers(&self, time: SlotTime) -> bool {
        self.grid().map(|grid| grid.contains(&time)).unwrap_or(false)
    }

    pub fn book(&mut self, time: SlotTime, now: DateTime<Utc>) -> Result<(), SlotError> {
        if self.booked_slots.contains(&time) {
            return Err(SlotError::AlreadyBooked(time));
        }
        if !self.offers(time) {
            return Err(SlotError::NotFound(format!(
                "{} is not offered by slot {}",
                time, self.id
            )));
        }

        match self.slot_type {
            SlotType::Stream => {
                self.booked_slots.insert(time);
            }
            SlotType::Wave => {
                let capacity = self.capacity();
                let count = self.wave_bookings.entry(time).or_insert(0);
                *count += 1;
                if *count >= capacity {
                    self.booked_slots.insert(time);
                }
            }
        }

        self.refresh_availability()?;
        self.updated_at = now;
        Ok(())
    }

    /// Releases one booking at `time`. Returns `false` when nothing was booked there.
    pub fn cancel(&mut self, time: SlotTime, now: DateTime<Utc>) -> Result<bool, SlotError> {
        let released = match self.slot_type {
            SlotType::Stream => self.booked_slots.remove(&time),
            SlotType::Wave => match self.wave_bookings.get_mut(&time) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    if *count == 0 {
                        self.wave_bookings.remove(&time);
                    }
                    self.booked_slots.remove(&time);
                    true
                }
                _ => self.booked_slots.remove(&time),
            },
        };

        if released {
            self.refresh_availability()?;
            self.updated_at = now;
        }
        Ok(released)
    }

    /// Merges a patch and recomputes availability when the grid or bookings changed.
    pub fn apply_patch(&mut self, patch: UpdateSlotRequest, now: DateTime<Utc>) -> Result<(), SlotError> {
        let affects_grid = patch.start_time.is_some()
            || patch.end_time.is_some()
            || patch.slot_duration.is_some()
            || patch.slot_type.is_some()
            || patch.max_patients.is_some()
            || patch.booked_slots.is_some();

        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            self.end_time = end_time;
        }
        if let Some(slot_duration) = patch.slot_duration {
            self.slot_duration = slot_duration;
        }
        if let Some(slot_type) = patch.slot_type {
            self.slot_type = slot_type;
        }
        if let Some(max_patients) = patch.max_patients {
            self.max_patients = Some(max_patients);
        }
        if let Some(is_recurring) = patch.is_recurring {
            self.is_recurring = is_recurring;
        }
        if let Some(recurring_weeks) = patch.recurring_weeks {
            self.recurring_weeks = Some(recurring_weeks);
        }

        self.validate_definition()?;

        if affects_grid {
            match patch.booked_slots {
                Some(booked) => self.replace_booked(booked),
                None => self.normalize_bookings(),
            }
            self.refresh_availability()?;
        }

        self.updated_at = now;
        Ok(())
    }

    fn validate_definition(&self) -> Result<(), SlotError> {
        if self.slot_duration <= 0 {
            return Err(SlotError::InvalidConfiguration(
                "Slot duration must be greater than zero".to_string(),
            ));
        }
        if self.start_time >= self.end_time {
            return Err(SlotError::InvalidConfiguration(
                "Start time must be before end time".to_string(),
            ));
        }
        if self.slot_type == SlotType::Wave && self.max_patients.unwrap_or(0) == 0 {
            return Err(SlotError::InvalidConfiguration(
                "Wave slots require max_patients of at least 1".to_string(),
            ));
        }
        if self.is_recurring && self.recurring_weeks.unwrap_or(0) == 0 {
            return Err(SlotError::InvalidConfiguration(
                "Recurring slots require recurring_weeks of at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Treats `booked` as the full set of fully booked times.
    fn replace_booked(&mut self, booked: BTreeSet<SlotTime>) {
        if self.slot_type == SlotType::Wave {
            let capacity = self.capacity();
            self.wave_bookings
                .retain(|time, count| booked.contains(time) || *count < capacity);
            for time in &booked {
                self.wave_bookings.insert(*time, capacity);
            }
        } else {
            self.wave_bookings.clear();
        }
        self.booked_slots = booked;
    }

    /// Re-derives `booked_slots` after a change of discipline or capacity.
    fn normalize_bookings(&mut self) {
        match self.slot_type {
            SlotType::Stream => {
                let partial: Vec<SlotTime> = self.wave_bookings.keys().copied().collect();
                self.booked_slots.extend(partial);
                self.wave_bookings.clear();
            }
            SlotType::Wave => {
                let capacity = self.capacity();
                for time in &self.booked_slots {
                    let count = self.wave_bookings.entry(*time).or_insert(capacity);
                    if *count == 0 {
                        *count = capacity;
                    }
                }
                for count in self.wave_bookings.values_mut() {
                    *count = (*count).min(capacity);
                }
                self.booked_slots = self
                    .wave_bookings
                    .iter()
                    .filter(|(_, count)| **count >= capacity)
                    .map(|(time, _)| *time)
                    .collect();
            }
        }
    }

    fn refresh_availability(&mut self) -> Result<(), SlotError> {
        let grid = self.grid()?;
        if let Some(orphan) = self.booked_slots.iter().find(|time| !grid.contains(time)) {
            return Err(SlotError::InvalidConfiguration(format!(
                "Booked time {} is not on the slot grid",
                orphan
            )));
        }
        if let Some(orphan) = self.wave_bookings.keys().find(|time| !grid.contains(time)) {
            return Err(SlotError::InvalidConfiguration(format!(
                "Booked time {} is not on the slot grid",
                orphan
            )));
        }

        self.available_slots = generate_slots(
            self.start_time,
            self.end_time,
            self.slot_duration,
            &self.booked_slots,
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub date: NaiveDate,
    pub start_time: SlotTime,
    pub end_time: SlotTime,
    pub slot_duration: i64,
    pub slot_type: SlotType,
    pub max_patients: Option<u32>,
    #[serde(default)]
    pub booked_slots: BTreeSet<SlotTime>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurring_weeks: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSlotRequest {
    pub date: Option<NaiveDate>,
    pub start_time: Option<SlotTime>,
    pub end_time: Option<SlotTime>,
    pub slot_duration: Option<i64>,
    pub slot_type: Option<SlotType>,
    pub max_patients: Option<u32>,
    pub booked_slots: Option<BTreeSet<SlotTime>>,
    pub is_recurring: Option<bool>,
    pub recurring_weeks: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub date: NaiveDate,
    pub time: SlotTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotListQuery {
    pub date: Option<NaiveDate>,
}
