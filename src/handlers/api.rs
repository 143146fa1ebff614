use axum::{
    extract::{Json as ExtractJson, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::collaborators::{
    AppointmentStore, RecurringBreakSource, ScheduleSource, TimeBlockSource,
};
use crate::error::{BookingFailure, StoreError};
use crate::models::appointment::{
    Appointment, AvailabilityResponse, BookingRequest, BookingResponse,
};
use crate::models::common::{AppointmentListParams, AvailabilityParams};
use crate::services::availability::compute_availability;
use crate::services::booking::BookingOrchestrator;

// AppState struct containing shared resources
pub struct AppState {
    pub orchestrator: Arc<BookingOrchestrator>,
    pub store: Arc<dyn AppointmentStore>,
    pub schedules: Arc<dyn ScheduleSource>,
    pub time_blocks: Arc<dyn TimeBlockSource>,
    pub recurring_breaks: Arc<dyn RecurringBreakSource>,
    pub provider_id: String,
    pub timezone: Tz,
}

// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

// Availability endpoint: bookable start times for one calendar day
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<AvailabilityResponse>, StatusCode> {
    info!(
        "Received availability request for date={} duration={:?}",
        params.date, params.duration_minutes
    );

    let date = match NaiveDate::parse_from_str(&params.date, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => {
            warn!("Rejecting availability request with bad date '{}'", params.date);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    // A missing or zero duration is the caller's error; the calculator never
    // defaults it.
    let duration_minutes = match params.duration_minutes {
        Some(minutes) if minutes > 0 => minutes,
        _ => {
            warn!("Rejecting availability request with missing or zero duration");
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let schedule = match state.schedules.fetch_weekly_schedule(&state.provider_id).await {
        Ok(schedule) => schedule,
        Err(e) => {
            error!("Failed to fetch weekly schedule: {}", e);
            return Err(StatusCode::BAD_GATEWAY);
        }
    };

    let time_blocks = match state
        .time_blocks
        .fetch_time_blocks(&state.provider_id, date)
        .await
    {
        Ok(blocks) => blocks,
        Err(e) => {
            error!("Failed to fetch time blocks: {}", e);
            return Err(StatusCode::BAD_GATEWAY);
        }
    };

    let recurring_breaks = match state
        .recurring_breaks
        .fetch_recurring_breaks(&state.provider_id)
        .await
    {
        Ok(breaks) => breaks,
        Err(e) => {
            error!("Failed to fetch recurring breaks: {}", e);
            return Err(StatusCode::BAD_GATEWAY);
        }
    };

    let appointments = match state.store.list_confirmed(&state.provider_id).await {
        Ok(appointments) => appointments,
        Err(e) => {
            error!("Failed to read appointments from primary store: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let slots = compute_availability(
        date,
        duration_minutes,
        &schedule,
        &appointments,
        &time_blocks,
        &recurring_breaks,
        state.timezone,
    );

    info!("Returning {} slots for {}", slots.len(), params.date);

    Ok(Json(AvailabilityResponse {
        date: params.date,
        duration_minutes,
        slots,
    }))
}

// Booking endpoint: one orchestrated attempt per request
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<BookingRequest>,
) -> (StatusCode, Json<BookingResponse>) {
    info!(
        "Received booking request for {} {} (token {})",
        request.date, request.time, request.idempotency_token
    );

    match state.orchestrator.book_appointment(&request).await {
        Ok(appointment) => {
            info!("Booking succeeded with appointment {}", appointment.id);
            (
                StatusCode::OK,
                Json(BookingResponse {
                    success: true,
                    message: "Appointment confirmed".to_string(),
                    appointment: Some(appointment),
                }),
            )
        }
        Err(failure) => {
            warn!("Booking failed ({}): {}", failure.kind(), failure);
            let (status, message) = failure_response(&failure);
            (
                status,
                Json(BookingResponse {
                    success: false,
                    message,
                    appointment: None,
                }),
            )
        }
    }
}

// Map a failure kind to a status and a user-facing message. The mapping is
// on the kind, never on error text.
fn failure_response(failure: &BookingFailure) -> (StatusCode, String) {
    match failure {
        BookingFailure::InvalidInput(detail) => (
            StatusCode::BAD_REQUEST,
            format!("Invalid booking request: {}", detail),
        ),
        BookingFailure::IdentityNotFound(_) => (
            StatusCode::NOT_FOUND,
            "Provider or service not found".to_string(),
        ),
        BookingFailure::IdentityResolutionFailed(_) => (
            StatusCode::BAD_GATEWAY,
            "Scheduling backend is unavailable, please retry".to_string(),
        ),
        BookingFailure::PrimaryWriteFailed(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "The appointment could not be saved".to_string(),
        ),
        BookingFailure::SecondaryConfirmFailed { .. } => (
            StatusCode::BAD_GATEWAY,
            "The booking could not be confirmed and was not saved".to_string(),
        ),
        // A rollback failure means a saved appointment may lack its
        // confirmation; it is never presented as an ordinary error.
        BookingFailure::RollbackFailed { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Booking failed in an inconsistent state, please contact support".to_string(),
        ),
        BookingFailure::Timeout(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            "The booking attempt timed out".to_string(),
        ),
        BookingFailure::Cancelled => (
            StatusCode::CONFLICT,
            "The booking attempt was cancelled".to_string(),
        ),
    }
}

// Management endpoint: list confirmed appointments, optionally for one day
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AppointmentListParams>,
) -> Result<Json<Vec<Appointment>>, StatusCode> {
    match state.store.list_confirmed(&state.provider_id).await {
        Ok(mut appointments) => {
            if let Some(date) = params.date {
                appointments.retain(|appointment| appointment.date == date);
            }
            Ok(Json(appointments))
        }
        Err(e) => {
            error!("Failed to list appointments: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// Management endpoint: cancel a stored appointment
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, StatusCode> {
    info!("Received request to cancel appointment {}", appointment_id);

    match state.store.cancel(&appointment_id).await {
        Ok(appointment) => {
            info!("Successfully cancelled appointment {}", appointment_id);
            Ok(Json(appointment))
        }
        Err(StoreError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to cancel appointment: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
