use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Lifecycle status of a stored appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

/// A booked appointment as persisted in the primary store.
///
/// `start_time` is the instant of record; `date` and `time` are rendered in
/// the provider's timezone when the record is created. `duration_minutes` is
/// copied from the service at creation time, so later service edits never
/// change existing appointments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub provider_id: String,
    pub service_id: String,
    pub client_name: String,
    pub client_contact: String,
    pub start_time: DateTime<Utc>,
    pub date: String,
    pub time: String,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
}

// A candidate bookable start time; computed on demand, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub date: String,
    pub start_time: String,
}

// Client-submitted booking request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub provider_ref: String,
    pub service_ref: String,
    pub client_name: String,
    pub client_contact: String,
    pub date: String,
    pub time: String,
    pub idempotency_token: String,
}

// Payload sent to the secondary confirmation service
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationPayload {
    pub appointment_id: String,
    pub provider_id: String,
    pub service_id: String,
    pub client_name: String,
    pub client_contact: String,
    pub start_time: DateTime<Utc>,
}

// Payload for the best-effort reminder dispatch after completion
#[derive(Debug, Clone, Serialize)]
pub struct ReminderPayload {
    pub appointment_id: String,
    pub client_name: String,
    pub client_contact: String,
    pub date: String,
    pub time: String,
}

// Response body for the booking endpoint
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub success: bool,
    pub message: String,
    pub appointment: Option<Appointment>,
}

// Response body for the availability endpoint
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub date: String,
    pub duration_minutes: u32,
    pub slots: Vec<Slot>,
}
