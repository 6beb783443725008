use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::ReminderError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderSubscription {
    pub user_id: String,
    pub appointment_id: String,
    pub enabled: bool,
    pub lead_minutes: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetReminderRequest {
    pub enabled: bool,
    pub lead_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderQuery {
    pub appointment_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

/// Appointment as stored under `appointments:{id}`. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRecord {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub status: AppointmentStatus,
}

impl AppointmentRecord {
    pub fn is_cancelled(&self) -> bool {
        self.status == AppointmentStatus::Cancelled
    }

    /// Start of the appointment, reading `date`/`time` as clinic-local wall time.
    pub fn starts_at(&self, clinic_offset: FixedOffset) -> Result<DateTime<Utc>, ReminderError> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|_| {
            ReminderError::MalformedAppointment(format!(
                "appointment {} has invalid date {:?}",
                self.id, self.date
            ))
        })?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(self.time.trim(), "%H:%M:%S"))
            .map_err(|_| {
                ReminderError::MalformedAppointment(format!(
                    "appointment {} has invalid time {:?}",
                    self.id, self.time
                ))
            })?;

        clinic_offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| {
                ReminderError::MalformedAppointment(format!(
                    "appointment {} has no unambiguous start",
                    self.id
                ))
            })
    }
}

/// Doctor profile subset stored under `doctors:{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorRecord {
    pub id: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepReport {
    pub total_reminders: u32,
    pub sent_reminders: u32,
    pub skipped_reminders: u32,
    pub failed_reminders: u32,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOutcome {
    Sent,
    NotDue,
    AlreadySent,
    AppointmentMissing,
}
