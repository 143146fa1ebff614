use std::env;

use async_trait::async_trait;
use chrono::NaiveDate;
use dotenv::dotenv;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::BackendAuth;
use crate::collaborators::{
    BookingConfirmationService, NotificationService, ProviderDirectory, ProviderId,
    RecurringBreakSource, ScheduleSource, ServiceCatalog, TimeBlockSource,
};
use crate::error::{BackendError, ConfirmError, ConfirmErrorCode};
use crate::models::appointment::{ConfirmationPayload, ReminderPayload};
use crate::models::schedule::{RecurringBreak, Service, TimeBlock, WeeklySchedule};

#[derive(Debug, Deserialize)]
struct ResolveProviderResponse {
    provider_id: String,
}

// Error body the confirmation service returns on a non-2xx status
#[derive(Debug, Deserialize)]
struct ConfirmErrorBody {
    code: ConfirmErrorCode,
    #[serde(default)]
    message: String,
}

/// Client for the remote scheduling backend.
///
/// Carries AKSK credentials and signs every request; one client instance is
/// shared across all handlers. Implements the directory, catalog, read-side
/// and confirmation collaborator traits.
pub struct SchedulingBackendClient {
    client: Client,
    app_id: String,
    secret_id: String,
    secret_key: String,
    endpoint: String,
}

impl SchedulingBackendClient {
    /// Create a new backend client from environment variables
    pub fn new() -> Self {
        dotenv().ok();

        Self {
            client: Client::new(),
            app_id: env::var("SCHEDULING_BACKEND_APP_ID")
                .expect("SCHEDULING_BACKEND_APP_ID must be set in environment"),
            secret_id: env::var("SCHEDULING_BACKEND_SECRET_ID")
                .expect("SCHEDULING_BACKEND_SECRET_ID must be set in environment"),
            secret_key: env::var("SCHEDULING_BACKEND_SECRET_KEY")
                .expect("SCHEDULING_BACKEND_SECRET_KEY must be set in environment"),
            endpoint: env::var("SCHEDULING_BACKEND_API_ENDPOINT")
                .unwrap_or_else(|_| "https://api.scheduling.example.com".to_string()),
        }
    }

    /// Construct against an explicit endpoint (used by tests).
    pub fn with_endpoint(app_id: &str, secret_id: &str, secret_key: &str, endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            app_id: app_id.to_string(),
            secret_id: secret_id.to_string(),
            secret_key: secret_key.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    // Build a signed request with the headers the backend verifies
    fn signed_request(
        &self,
        method: reqwest::Method,
        full_uri: &str,
        body: &str,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.endpoint, full_uri);
        let timestamp = BackendAuth::get_timestamp();
        let nonce = BackendAuth::generate_nonce();
        let signature = BackendAuth::generate_signature(
            &self.secret_id,
            &self.secret_key,
            method.as_str(),
            full_uri,
            timestamp,
            &nonce,
            body,
        );

        debug!("API URL: {}", url);

        self.client
            .request(method, &url)
            .header("Content-Type", "application/json")
            .header("X-SB-Key", &self.secret_id)
            .header("X-SB-Timestamp", timestamp.to_string())
            .header("X-SB-Nonce", &nonce)
            .header("X-SB-Signature", signature)
            .header("AppId", &self.app_id)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        full_uri: &str,
    ) -> Result<T, BackendError> {
        let res = self
            .signed_request(reqwest::Method::GET, full_uri, "")
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(BackendError::UnexpectedStatus(status.as_u16()));
        }

        res.json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ProviderDirectory for SchedulingBackendClient {
    async fn resolve_provider(
        &self,
        external_ref: &str,
    ) -> Result<Option<ProviderId>, BackendError> {
        let full_uri = format!("/v1/providers/resolve?ref={}", external_ref);
        info!("Resolving provider reference '{}'", external_ref);

        let res = self
            .signed_request(reqwest::Method::GET, &full_uri, "")
            .send()
            .await?;

        let status = res.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(BackendError::UnexpectedStatus(status.as_u16()));
        }

        let body = res
            .json::<ResolveProviderResponse>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Some(body.provider_id))
    }
}

#[async_trait]
impl ServiceCatalog for SchedulingBackendClient {
    async fn resolve_service(&self, service_ref: &str) -> Result<Option<Service>, BackendError> {
        let full_uri = format!("/v1/services/resolve?ref={}", service_ref);
        info!("Resolving service reference '{}'", service_ref);

        let res = self
            .signed_request(reqwest::Method::GET, &full_uri, "")
            .send()
            .await?;

        let status = res.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(BackendError::UnexpectedStatus(status.as_u16()));
        }

        let service = res
            .json::<Service>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Some(service))
    }
}

#[async_trait]
impl ScheduleSource for SchedulingBackendClient {
    async fn fetch_weekly_schedule(
        &self,
        provider_id: &str,
    ) -> Result<WeeklySchedule, BackendError> {
        let full_uri = format!("/v1/providers/{}/schedule", provider_id);
        self.get_json(&full_uri).await
    }
}

#[async_trait]
impl TimeBlockSource for SchedulingBackendClient {
    async fn fetch_time_blocks(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeBlock>, BackendError> {
        let full_uri = format!(
            "/v1/providers/{}/time-blocks?date={}",
            provider_id,
            date.format("%Y-%m-%d")
        );
        self.get_json(&full_uri).await
    }
}

#[async_trait]
impl RecurringBreakSource for SchedulingBackendClient {
    async fn fetch_recurring_breaks(
        &self,
        provider_id: &str,
    ) -> Result<Vec<RecurringBreak>, BackendError> {
        let full_uri = format!("/v1/providers/{}/recurring-breaks", provider_id);
        self.get_json(&full_uri).await
    }
}

#[async_trait]
impl BookingConfirmationService for SchedulingBackendClient {
    async fn confirm(
        &self,
        payload: &ConfirmationPayload,
        idempotency_token: &str,
    ) -> Result<(), ConfirmError> {
        let full_uri = "/v1/bookings/confirm";
        let body = serde_json::to_string(payload).map_err(|e| ConfirmError {
            code: ConfirmErrorCode::Internal,
            message: format!("failed to encode payload: {}", e),
        })?;

        info!(
            "Confirming booking for appointment {} with idempotency token {}",
            payload.appointment_id, idempotency_token
        );

        let res = self
            .signed_request(reqwest::Method::POST, full_uri, &body)
            .header("X-Idempotency-Key", idempotency_token)
            .body(body)
            .send()
            .await
            .map_err(|e| ConfirmError {
                code: ConfirmErrorCode::Unavailable,
                message: e.to_string(),
            })?;

        let status = res.status();
        if status.is_success() {
            info!("Confirmation accepted with status {}", status);
            return Ok(());
        }

        // The confirmation service returns a structured error body; callers
        // branch on the code, never on the message text.
        match res.json::<ConfirmErrorBody>().await {
            Ok(body) => Err(ConfirmError {
                code: body.code,
                message: body.message,
            }),
            Err(e) => {
                warn!(
                    "Confirmation service returned status {} with undecodable body: {}",
                    status, e
                );
                Err(ConfirmError {
                    code: ConfirmErrorCode::Internal,
                    message: format!("status {} with undecodable body", status),
                })
            }
        }
    }
}

#[async_trait]
impl NotificationService for SchedulingBackendClient {
    async fn send_reminder(&self, payload: &ReminderPayload) -> Result<(), BackendError> {
        let full_uri = "/v1/notifications/reminder";
        let body =
            serde_json::to_string(payload).map_err(|e| BackendError::Decode(e.to_string()))?;

        let res = self
            .signed_request(reqwest::Method::POST, full_uri, &body)
            .body(body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(BackendError::UnexpectedStatus(status.as_u16()));
        }

        info!(
            "Reminder dispatched for appointment {}",
            payload.appointment_id
        );
        Ok(())
    }
}
