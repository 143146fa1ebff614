//! Abstract collaborator interfaces the scheduling core depends on.
//!
//! The core never talks to a transport directly: the orchestrator and the
//! availability read path are written against these traits, and the concrete
//! implementations (`SchedulingBackendClient`, `CsvAppointmentStore`) are
//! injected at startup. Implementations must be `Send + Sync` so they can be
//! shared behind `Arc` across request handlers.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{BackendError, ConfirmError, StoreError};
use crate::models::appointment::{Appointment, ConfirmationPayload, ReminderPayload};
use crate::models::schedule::{RecurringBreak, Service, TimeBlock, WeeklySchedule};

/// Durable identifier of a provider, resolved from an external reference.
pub type ProviderId = String;

/// Fields of a new appointment as handed to the primary store. The store
/// assigns the id and stamps the creation time.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub idempotency_token: String,
    pub provider_id: String,
    pub service_id: String,
    pub client_name: String,
    pub client_contact: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub date: String,
    pub time: String,
    pub duration_minutes: u32,
}

#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Resolve an external provider reference to a durable provider id.
    /// `Ok(None)` means the reference is unknown, not an error.
    async fn resolve_provider(&self, external_ref: &str)
        -> Result<Option<ProviderId>, BackendError>;
}

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Resolve a service id-or-name reference to the full service record.
    async fn resolve_service(&self, service_ref: &str) -> Result<Option<Service>, BackendError>;
}

/// Primary durable store for appointments. `delete` exists only for
/// compensation after a failed secondary confirmation.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create(&self, record: &NewAppointment) -> Result<Appointment, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn find_by_idempotency_token(
        &self,
        token: &str,
    ) -> Result<Option<Appointment>, StoreError>;

    /// All confirmed appointments for a provider, across days. Day scoping is
    /// the conflict aggregator's job, not the store's.
    async fn list_confirmed(&self, provider_id: &str) -> Result<Vec<Appointment>, StoreError>;

    /// Mark a stored appointment cancelled (management operation).
    async fn cancel(&self, id: &str) -> Result<Appointment, StoreError>;
}

#[async_trait]
pub trait BookingConfirmationService: Send + Sync {
    /// Confirm a booking with the secondary service. Repeated calls with the
    /// same idempotency token are no-ops on the far side.
    async fn confirm(
        &self,
        payload: &ConfirmationPayload,
        idempotency_token: &str,
    ) -> Result<(), ConfirmError>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Best-effort reminder dispatch; callers fire and forget.
    async fn send_reminder(&self, payload: &ReminderPayload) -> Result<(), BackendError>;
}

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_weekly_schedule(&self, provider_id: &str)
        -> Result<WeeklySchedule, BackendError>;
}

#[async_trait]
pub trait TimeBlockSource: Send + Sync {
    async fn fetch_time_blocks(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeBlock>, BackendError>;
}

#[async_trait]
pub trait RecurringBreakSource: Send + Sync {
    async fn fetch_recurring_breaks(
        &self,
        provider_id: &str,
    ) -> Result<Vec<RecurringBreak>, BackendError>;
}
