use std::sync::Arc;

use tracing::{info, instrument};

use notification_cell::{
    NewNotification, Notification, NotificationService, NotificationType, RecipientType,
    RelatedType,
};
use shared_database::{get_json, AppState, KeyValueStore};

use crate::{AppointmentRecord, DoctorRecord, ReminderError};

const FALLBACK_DOCTOR_NAME: &str = "your doctor";

/// Builds and delivers reminder notifications.
///
/// Both the scanner and doctor-initiated reminders end up in `send_reminder`.
pub struct ReminderDispatcher {
    store: Arc<dyn KeyValueStore>,
    notifications: NotificationService,
}

impl ReminderDispatcher {
    pub fn new(state: &AppState) -> Self {
        Self::with_parts(state.store.clone(), NotificationService::new(state))
    }

    pub fn with_parts(store: Arc<dyn KeyValueStore>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
        }
    }

    pub fn appointment_key(appointment_id: &str) -> String {
        format!("appointments:{}", appointment_id)
    }

    pub fn doctor_key(doctor_id: &str) -> String {
        format!("doctors:{}", doctor_id)
    }

    pub async fn find_appointment(
        &self,
        appointment_id: &str,
    ) -> Result<Option<AppointmentRecord>, ReminderError> {
        Ok(get_json(self.store.as_ref(), &Self::appointment_key(appointment_id)).await?)
    }

    pub async fn doctor_display_name(&self, doctor_id: &str) -> Result<String, ReminderError> {
        let doctor: Option<DoctorRecord> =
            get_json(self.store.as_ref(), &Self::doctor_key(doctor_id)).await?;

        Ok(match doctor {
            Some(doctor) if !doctor.full_name.trim().is_empty() => format!("Dr. {}", doctor.full_name.trim()),
            _ => FALLBACK_DOCTOR_NAME.to_string(),
        })
    }

    pub async fn send_reminder(
        &self,
        recipient_id: &str,
        appointment: &AppointmentRecord,
        doctor_name: &str,
    ) -> Result<Notification, ReminderError> {
        let payload = reminder_payload(recipient_id, appointment, doctor_name);
        Ok(self.notifications.create_notification(payload).await?)
    }

    /// One-off reminder from the appointment's own doctor. No window and no dedup marker.
    #[instrument(skip(self))]
    pub async fn send_manual_reminder(
        &self,
        doctor_id: &str,
        appointment_id: &str,
    ) -> Result<Notification, ReminderError> {
        let appointment = self
            .find_appointment(appointment_id)
            .await?
            .ok_or_else(|| ReminderError::NotFound(format!("Appointment {} not found", appointment_id)))?;

        if appointment.doctor_id != doctor_id {
            return Err(ReminderError::Unauthorized(format!(
                "Doctor {} does not own appointment {}",
                doctor_id, appointment_id
            )));
        }

        let doctor_name = self.doctor_display_name(doctor_id).await?;
        let notification = self
            .send_reminder(&appointment.patient_id, &appointment, &doctor_name)
            .await?;

        info!("Manual reminder sent for appointment {}", appointment_id);
        Ok(notification)
    }
}

pub fn reminder_payload(
    recipient_id: &str,
    appointment: &AppointmentRecord,
    doctor_name: &str,
) -> NewNotification {
    NewNotification::new(
        NotificationType::Info,
        "Appointment Reminder",
        format!(
            "Your appointment with {} is scheduled for {} at {}.",
            doctor_name,
            appointment.date.trim(),
            appointment.time.trim()
        ),
        recipient_id,
        RecipientType::User,
    )
    .related_to(RelatedType::Appointment, appointment.id.clone())
}
