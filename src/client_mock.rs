use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::mock;
use uuid::Uuid;

use crate::collaborators::{
    AppointmentStore, BookingConfirmationService, NewAppointment, NotificationService,
    ProviderDirectory, ProviderId, RecurringBreakSource, ScheduleSource, ServiceCatalog,
    TimeBlockSource,
};
use crate::error::{BackendError, ConfirmError, StoreError};
use crate::models::appointment::{
    Appointment, AppointmentStatus, ConfirmationPayload, ReminderPayload,
};
use crate::models::schedule::{RecurringBreak, Service, TimeBlock, WeeklySchedule};

// Mock for every remote collaborator the scheduling backend serves
mock! {
    pub Backend {}

    #[async_trait]
    impl ProviderDirectory for Backend {
        async fn resolve_provider(
            &self,
            external_ref: &str,
        ) -> Result<Option<ProviderId>, BackendError>;
    }

    #[async_trait]
    impl ServiceCatalog for Backend {
        async fn resolve_service(&self, service_ref: &str) -> Result<Option<Service>, BackendError>;
    }

    #[async_trait]
    impl ScheduleSource for Backend {
        async fn fetch_weekly_schedule(
            &self,
            provider_id: &str,
        ) -> Result<WeeklySchedule, BackendError>;
    }

    #[async_trait]
    impl TimeBlockSource for Backend {
        async fn fetch_time_blocks(
            &self,
            provider_id: &str,
            date: NaiveDate,
        ) -> Result<Vec<TimeBlock>, BackendError>;
    }

    #[async_trait]
    impl RecurringBreakSource for Backend {
        async fn fetch_recurring_breaks(
            &self,
            provider_id: &str,
        ) -> Result<Vec<RecurringBreak>, BackendError>;
    }

    #[async_trait]
    impl BookingConfirmationService for Backend {
        async fn confirm(
            &self,
            payload: &ConfirmationPayload,
            idempotency_token: &str,
        ) -> Result<(), ConfirmError>;
    }

    #[async_trait]
    impl NotificationService for Backend {
        async fn send_reminder(&self, payload: &ReminderPayload) -> Result<(), BackendError>;
    }
}

/// In-memory primary store for workflow tests: behaves like the real store
/// and exposes its contents, so tests can assert what survived a rollback.
pub struct InMemoryAppointmentStore {
    appointments: Mutex<Vec<Appointment>>,
    tokens: Mutex<Vec<(String, String)>>, // (idempotency_token, appointment_id)
    pub creates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub fail_creates: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self {
            appointments: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
            creates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_creates: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn contents(&self) -> Vec<Appointment> {
        self.appointments.lock().unwrap().clone()
    }
}

impl Default for InMemoryAppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create(&self, record: &NewAppointment) -> Result<Appointment, StoreError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(StoreError::Malformed("injected create failure".to_string()));
        }
        self.creates.fetch_add(1, Ordering::SeqCst);

        let appointment = Appointment {
            id: format!("apt-{}", Uuid::new_v4()),
            provider_id: record.provider_id.clone(),
            service_id: record.service_id.clone(),
            client_name: record.client_name.clone(),
            client_contact: record.client_contact.clone(),
            start_time: record.start_time,
            date: record.date.clone(),
            time: record.time.clone(),
            duration_minutes: record.duration_minutes,
            status: AppointmentStatus::Confirmed,
        };

        // The idempotency token rides along in a parallel entry so
        // find_by_idempotency_token works; the public Appointment type does
        // not carry the token.
        self.appointments.lock().unwrap().push(appointment.clone());
        self.tokens
            .lock()
            .unwrap()
            .push((record.idempotency_token.clone(), appointment.id.clone()));
        Ok(appointment)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Malformed("injected delete failure".to_string()));
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.appointments.lock().unwrap().retain(|a| a.id != id);
        self.tokens.lock().unwrap().retain(|(_, aid)| aid != id);
        Ok(())
    }

    async fn find_by_idempotency_token(
        &self,
        token: &str,
    ) -> Result<Option<Appointment>, StoreError> {
        let tokens = self.tokens.lock().unwrap();
        let Some((_, id)) = tokens.iter().find(|(t, _)| t == token) else {
            return Ok(None);
        };
        let appointments = self.appointments.lock().unwrap();
        Ok(appointments
            .iter()
            .find(|a| &a.id == id && a.status == AppointmentStatus::Confirmed)
            .cloned())
    }

    async fn list_confirmed(&self, provider_id: &str) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.provider_id == provider_id && a.status == AppointmentStatus::Confirmed)
            .cloned()
            .collect())
    }

    async fn cancel(&self, id: &str) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.lock().unwrap();
        for appointment in appointments.iter_mut() {
            if appointment.id == id && appointment.status == AppointmentStatus::Confirmed {
                appointment.status = AppointmentStatus::Cancelled;
                return Ok(appointment.clone());
            }
        }
        Err(StoreError::NotFound(id.to_string()))
    }
}
