use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::collaborators::{AppointmentStore, NewAppointment};
use crate::error::StoreError;
use crate::models::appointment::{Appointment, AppointmentStatus};

const HEADERS: [&str; 13] = [
    "id",
    "idempotency_token",
    "provider_id",
    "service_id",
    "client_name",
    "client_contact",
    "start_time",
    "date",
    "time",
    "duration_minutes",
    "status",
    "created_at",
    "cancelled_at",
];

// Row shape as persisted in the CSV file
#[derive(Debug, Serialize, Deserialize, Clone)]
struct AppointmentRow {
    id: String,
    idempotency_token: String,
    provider_id: String,
    service_id: String,
    client_name: String,
    client_contact: String,
    start_time: String, // ISO format
    date: String,
    time: String,
    duration_minutes: u32,
    status: String,
    created_at: String,   // ISO format
    cancelled_at: String, // ISO format (empty if not cancelled)
}

impl AppointmentRow {
    fn to_appointment(&self) -> Result<Appointment, StoreError> {
        let start_time = DateTime::parse_from_rfc3339(&self.start_time)
            .map_err(|e| StoreError::Malformed(format!("bad start_time '{}': {}", self.start_time, e)))?
            .with_timezone(&Utc);

        let status = match self.status.as_str() {
            "confirmed" => AppointmentStatus::Confirmed,
            "cancelled" => AppointmentStatus::Cancelled,
            other => {
                return Err(StoreError::Malformed(format!(
                    "unknown appointment status '{}'",
                    other
                )))
            }
        };

        Ok(Appointment {
            id: self.id.clone(),
            provider_id: self.provider_id.clone(),
            service_id: self.service_id.clone(),
            client_name: self.client_name.clone(),
            client_contact: self.client_contact.clone(),
            start_time,
            date: self.date.clone(),
            time: self.time.clone(),
            duration_minutes: self.duration_minutes,
            status,
        })
    }
}

/// CSV-backed primary appointment store.
///
/// Creates append rows; delete and cancel rewrite the whole file under the
/// file mutex. Delete exists only for compensation after a failed secondary
/// confirmation.
pub struct CsvAppointmentStore {
    csv_path: String,
    file_mutex: Mutex<()>,
}

impl CsvAppointmentStore {
    pub fn new(csv_path: &str) -> Self {
        // Create the CSV file if it doesn't exist with proper headers
        if !Path::new(csv_path).exists() {
            info!("Creating new appointments database file at {}", csv_path);

            let file = File::create(csv_path).unwrap_or_else(|e| {
                error!("Failed to create database file: {}", e);
                panic!("Failed to create database file: {}", e)
            });

            let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

            if let Err(e) = writer.write_record(HEADERS) {
                error!("Failed to write headers: {}", e);
                panic!("Failed to write headers: {}", e);
            }

            if let Err(e) = writer.flush() {
                error!("Failed to flush headers: {}", e);
                panic!("Failed to flush headers: {}", e);
            }
        }

        Self {
            csv_path: csv_path.to_string(),
            file_mutex: Mutex::new(()),
        }
    }

    fn read_rows(&self) -> Result<Vec<AppointmentRow>, StoreError> {
        if !Path::new(&self.csv_path).exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.csv_path)?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

        let mut rows = Vec::new();
        for result in reader.deserialize() {
            let row: AppointmentRow = result?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn rewrite_rows(&self, rows: &[AppointmentRow]) -> Result<(), StoreError> {
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.csv_path)?;

        // Headers go out explicitly so an empty rewrite still leaves a
        // readable file for the next append.
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(HEADERS)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn append_row(&self, row: &AppointmentRow) -> Result<(), StoreError> {
        let file = OpenOptions::new().append(true).open(&self.csv_path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;

        info!(
            "Stored appointment {} for token {}",
            row.id, row.idempotency_token
        );
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for CsvAppointmentStore {
    async fn create(&self, record: &NewAppointment) -> Result<Appointment, StoreError> {
        let _lock = self.file_mutex.lock().map_err(|_| StoreError::Poisoned)?;

        let row = AppointmentRow {
            id: format!("apt-{}", Uuid::new_v4()),
            idempotency_token: record.idempotency_token.clone(),
            provider_id: record.provider_id.clone(),
            service_id: record.service_id.clone(),
            client_name: record.client_name.clone(),
            client_contact: record.client_contact.clone(),
            start_time: record.start_time.to_rfc3339(),
            date: record.date.clone(),
            time: record.time.clone(),
            duration_minutes: record.duration_minutes,
            status: AppointmentStatus::Confirmed.as_str().to_string(),
            created_at: Utc::now().to_rfc3339(),
            cancelled_at: String::new(),
        };

        self.append_row(&row)?;
        row.to_appointment()
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _lock = self.file_mutex.lock().map_err(|_| StoreError::Poisoned)?;

        let rows = self.read_rows()?;
        let remaining: Vec<AppointmentRow> =
            rows.into_iter().filter(|row| row.id != id).collect();

        self.rewrite_rows(&remaining)?;
        info!("Deleted appointment {} from primary store", id);
        Ok(())
    }

    async fn find_by_idempotency_token(
        &self,
        token: &str,
    ) -> Result<Option<Appointment>, StoreError> {
        let _lock = self.file_mutex.lock().map_err(|_| StoreError::Poisoned)?;

        for row in self.read_rows()? {
            if row.idempotency_token == token
                && row.status == AppointmentStatus::Confirmed.as_str()
            {
                return row.to_appointment().map(Some);
            }
        }
        Ok(None)
    }

    async fn list_confirmed(&self, provider_id: &str) -> Result<Vec<Appointment>, StoreError> {
        let _lock = self.file_mutex.lock().map_err(|_| StoreError::Poisoned)?;

        let mut appointments = Vec::new();
        for row in self.read_rows()? {
            if row.provider_id != provider_id
                || row.status != AppointmentStatus::Confirmed.as_str()
            {
                continue;
            }
            match row.to_appointment() {
                Ok(appointment) => appointments.push(appointment),
                Err(e) => warn!("Skipping malformed appointment row {}: {}", row.id, e),
            }
        }
        Ok(appointments)
    }

    async fn cancel(&self, id: &str) -> Result<Appointment, StoreError> {
        let _lock = self.file_mutex.lock().map_err(|_| StoreError::Poisoned)?;

        let mut rows = self.read_rows()?;
        let mut cancelled = None;

        for row in rows.iter_mut() {
            if row.id == id && row.status == AppointmentStatus::Confirmed.as_str() {
                row.status = AppointmentStatus::Cancelled.as_str().to_string();
                row.cancelled_at = Utc::now().to_rfc3339();
                cancelled = Some(row.clone());
                break;
            }
        }

        let Some(row) = cancelled else {
            warn!("No active appointment found with id {}", id);
            return Err(StoreError::NotFound(id.to_string()));
        };

        self.rewrite_rows(&rows)?;
        info!("Marked appointment {} as cancelled", id);
        row.to_appointment()
    }
}

/// Build the store from `APPOINTMENT_DATABASE_PATH`, creating the data
/// directory when running against the default path.
pub fn create_appointment_store() -> Arc<CsvAppointmentStore> {
    let default_path = "/app/data/appointments.csv";
    let csv_path =
        std::env::var("APPOINTMENT_DATABASE_PATH").unwrap_or_else(|_| default_path.to_string());

    if csv_path == default_path {
        let dir = Path::new(default_path).parent().unwrap();
        if let Err(e) = std::fs::create_dir_all(dir) {
            error!("Failed to create data directory: {}", e);
            panic!("Failed to create data directory: {}", e);
        }
    }

    Arc::new(CsvAppointmentStore::new(&csv_path))
}
