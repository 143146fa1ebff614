//! Booking orchestration: a finite-state workflow that takes a client's
//! chosen slot through validation, identity resolution, the primary durable
//! write and the secondary confirmation call, compensating the primary write
//! when the confirmation fails.
//!
//! Concurrent attempts on the same slot are not serialized here: the
//! availability calculator only guards what is shown to a client. Two
//! attempts that both read a free slot before either writes can both
//! succeed. Preventing that requires a uniqueness constraint or a
//! per-provider lock in the primary store, which is outside this core.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::collaborators::{
    AppointmentStore, BookingConfirmationService, NewAppointment, NotificationService,
    ProviderDirectory, ServiceCatalog,
};
use crate::error::{BookingFailure, BookingStep};
use crate::models::appointment::{
    Appointment, BookingRequest, ConfirmationPayload, ReminderPayload,
};
use crate::services::conflicts::parse_hhmm;

/// Default bound on each blocking step, matching the service's own
/// request timeout.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// States of one booking attempt. Every attempt walks these in order;
/// `CompensatingRollback` is entered only between a successful primary write
/// and a failed secondary confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingState {
    Validating,
    ResolvingProviderIdentity,
    ResolvingServiceIdentity,
    CreatingPrimaryRecord,
    ConfirmingWithSecondaryService,
    CompensatingRollback,
    Completed,
    Failed,
}

impl std::fmt::Display for BookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BookingState::Validating => "Validating",
            BookingState::ResolvingProviderIdentity => "ResolvingProviderIdentity",
            BookingState::ResolvingServiceIdentity => "ResolvingServiceIdentity",
            BookingState::CreatingPrimaryRecord => "CreatingPrimaryRecord",
            BookingState::ConfirmingWithSecondaryService => "ConfirmingWithSecondaryService",
            BookingState::CompensatingRollback => "CompensatingRollback",
            BookingState::Completed => "Completed",
            BookingState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Drives booking attempts against the injected collaborators.
pub struct BookingOrchestrator {
    directory: Arc<dyn ProviderDirectory>,
    catalog: Arc<dyn ServiceCatalog>,
    store: Arc<dyn AppointmentStore>,
    confirmation: Arc<dyn BookingConfirmationService>,
    notifier: Arc<dyn NotificationService>,
    timezone: Tz,
    step_timeout: Duration,
}

impl BookingOrchestrator {
    pub fn new(
        directory: Arc<dyn ProviderDirectory>,
        catalog: Arc<dyn ServiceCatalog>,
        store: Arc<dyn AppointmentStore>,
        confirmation: Arc<dyn BookingConfirmationService>,
        notifier: Arc<dyn NotificationService>,
        timezone: Tz,
    ) -> Self {
        Self {
            directory,
            catalog,
            store,
            confirmation,
            notifier,
            timezone,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Override the per-step timeout (tests use short ones).
    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    /// Execute one booking attempt to a terminal state.
    pub async fn book_appointment(
        &self,
        request: &BookingRequest,
    ) -> Result<Appointment, BookingFailure> {
        self.execute(request, None).await
    }

    /// Like [`book_appointment`](Self::book_appointment), but honoring a
    /// caller-owned cancellation flag. The flag is consulted only before the
    /// primary write is issued; once durable state exists the attempt runs to
    /// a terminal state.
    pub async fn book_appointment_cancellable(
        &self,
        request: &BookingRequest,
        cancel_flag: Arc<AtomicBool>,
    ) -> Result<Appointment, BookingFailure> {
        self.execute(request, Some(cancel_flag)).await
    }

    async fn execute(
        &self,
        request: &BookingRequest,
        cancel_flag: Option<Arc<AtomicBool>>,
    ) -> Result<Appointment, BookingFailure> {
        let token = &request.idempotency_token;
        let mut state = BookingState::Validating;

        // Validating: reject malformed input before any external call.
        let (date, start_minutes) = validate_request(request)?;
        let start_time = local_instant(date, start_minutes, self.timezone).ok_or_else(|| {
            BookingFailure::InvalidInput(format!(
                "time {} on {} does not exist in timezone {}",
                request.time, request.date, self.timezone
            ))
        })?;

        // Idempotency replay: a confirmed record for this token means a prior
        // attempt already completed (or left durable state pending manual
        // reconciliation) — return it without touching either backend again.
        match self.store.find_by_idempotency_token(token).await {
            Ok(Some(existing)) => {
                info!(
                    "Idempotency token {} already has appointment {}, replaying result",
                    token, existing.id
                );
                return Ok(existing);
            }
            Ok(None) => {}
            Err(e) => warn!("Idempotency lookup failed, treating token as new: {}", e),
        }

        self.check_cancelled(&cancel_flag, &mut state)?;
        transition(&mut state, BookingState::ResolvingProviderIdentity, token);

        let provider_id = match timeout(
            self.step_timeout,
            self.directory.resolve_provider(&request.provider_ref),
        )
        .await
        {
            Err(_) => return self.fail(
                &mut state,
                BookingFailure::Timeout(BookingStep::ResolvingProviderIdentity),
            ),
            Ok(Err(e)) => {
                return self.fail(
                    &mut state,
                    BookingFailure::IdentityResolutionFailed(format!(
                        "provider directory: {}",
                        e
                    )),
                )
            }
            Ok(Ok(None)) => {
                return self.fail(
                    &mut state,
                    BookingFailure::IdentityNotFound(format!(
                        "provider '{}'",
                        request.provider_ref
                    )),
                )
            }
            Ok(Ok(Some(id))) => id,
        };

        self.check_cancelled(&cancel_flag, &mut state)?;
        transition(&mut state, BookingState::ResolvingServiceIdentity, token);

        let service = match timeout(
            self.step_timeout,
            self.catalog.resolve_service(&request.service_ref),
        )
        .await
        {
            Err(_) => return self.fail(
                &mut state,
                BookingFailure::Timeout(BookingStep::ResolvingServiceIdentity),
            ),
            Ok(Err(e)) => {
                return self.fail(
                    &mut state,
                    BookingFailure::IdentityResolutionFailed(format!("service catalog: {}", e)),
                )
            }
            Ok(Ok(None)) => {
                return self.fail(
                    &mut state,
                    BookingFailure::IdentityNotFound(format!(
                        "service '{}'",
                        request.service_ref
                    )),
                )
            }
            Ok(Ok(Some(service))) => service,
        };

        // Last cancellation point: once the primary write is issued the
        // workflow must reach a terminal state on its own.
        self.check_cancelled(&cancel_flag, &mut state)?;
        transition(&mut state, BookingState::CreatingPrimaryRecord, token);

        // Duration is copied from the service now; later catalog edits must
        // not retroactively change this appointment.
        let record = NewAppointment {
            idempotency_token: token.clone(),
            provider_id: provider_id.clone(),
            service_id: service.id.clone(),
            client_name: request.client_name.clone(),
            client_contact: request.client_contact.clone(),
            start_time,
            date: request.date.clone(),
            time: request.time.clone(),
            duration_minutes: service.duration_minutes,
        };

        let appointment = match timeout(self.step_timeout, self.store.create(&record)).await {
            Err(_) => {
                return self.fail(
                    &mut state,
                    BookingFailure::Timeout(BookingStep::CreatingPrimaryRecord),
                )
            }
            Ok(Err(e)) => {
                return self.fail(&mut state, BookingFailure::PrimaryWriteFailed(e.to_string()))
            }
            Ok(Ok(appointment)) => appointment,
        };

        transition(
            &mut state,
            BookingState::ConfirmingWithSecondaryService,
            token,
        );

        // The confirmation call needs the primary record's identifier, so it
        // can never run before the write above.
        let payload = ConfirmationPayload {
            appointment_id: appointment.id.clone(),
            provider_id: provider_id.clone(),
            service_id: service.id.clone(),
            client_name: request.client_name.clone(),
            client_contact: request.client_contact.clone(),
            start_time,
        };

        match timeout(self.step_timeout, self.confirmation.confirm(&payload, token)).await {
            Err(_) => {
                // Timed out with durable state behind us: compensate first,
                // then surface the timeout.
                warn!(
                    "Confirmation timed out for appointment {}, compensating",
                    appointment.id
                );
                self.compensate(&mut state, &appointment, token).await?;
                self.fail(
                    &mut state,
                    BookingFailure::Timeout(BookingStep::ConfirmingWithSecondaryService),
                )
            }
            Ok(Err(confirm_err)) => {
                // Structured code from the far side; the branch is on the
                // code, never on message text.
                warn!(
                    "Confirmation rejected appointment {} with code {}: {}",
                    appointment.id, confirm_err.code, confirm_err.message
                );
                self.compensate(&mut state, &appointment, token).await?;
                self.fail(
                    &mut state,
                    BookingFailure::SecondaryConfirmFailed {
                        code: confirm_err.code,
                    },
                )
            }
            Ok(Ok(())) => {
                transition(&mut state, BookingState::Completed, token);
                info!(
                    "Booking completed: appointment {} for {} at {} {}",
                    appointment.id, appointment.client_name, appointment.date, appointment.time
                );
                self.dispatch_reminder(&appointment);
                Ok(appointment)
            }
        }
    }

    /// Delete the just-created primary record. A rollback failure is its own
    /// terminal kind — the durable record may still exist without a matching
    /// confirmation and needs out-of-band reconciliation.
    async fn compensate(
        &self,
        state: &mut BookingState,
        appointment: &Appointment,
        token: &str,
    ) -> Result<(), BookingFailure> {
        transition(state, BookingState::CompensatingRollback, token);

        match timeout(self.step_timeout, self.store.delete(&appointment.id)).await {
            Err(_) => {
                error!(
                    "Rollback of appointment {} timed out; manual reconciliation required",
                    appointment.id
                );
                *state = BookingState::Failed;
                Err(BookingFailure::RollbackFailed {
                    appointment_id: appointment.id.clone(),
                    detail: "rollback timed out".to_string(),
                })
            }
            Ok(Err(e)) => {
                error!(
                    "Rollback of appointment {} failed: {}; manual reconciliation required",
                    appointment.id, e
                );
                *state = BookingState::Failed;
                Err(BookingFailure::RollbackFailed {
                    appointment_id: appointment.id.clone(),
                    detail: e.to_string(),
                })
            }
            Ok(Ok(())) => {
                info!("Rolled back appointment {}", appointment.id);
                Ok(())
            }
        }
    }

    /// Reminder dispatch is best-effort and happens only after `Completed`;
    /// its failure is logged and never changes the booking outcome.
    fn dispatch_reminder(&self, appointment: &Appointment) {
        let notifier = Arc::clone(&self.notifier);
        let payload = ReminderPayload {
            appointment_id: appointment.id.clone(),
            client_name: appointment.client_name.clone(),
            client_contact: appointment.client_contact.clone(),
            date: appointment.date.clone(),
            time: appointment.time.clone(),
        };

        tokio::spawn(async move {
            if let Err(e) = notifier.send_reminder(&payload).await {
                warn!(
                    "Reminder dispatch failed for appointment {}: {}",
                    payload.appointment_id, e
                );
            }
        });
    }

    fn check_cancelled(
        &self,
        cancel_flag: &Option<Arc<AtomicBool>>,
        state: &mut BookingState,
    ) -> Result<(), BookingFailure> {
        if let Some(flag) = cancel_flag {
            if flag.load(Ordering::SeqCst) {
                info!("Booking attempt cancelled before primary write");
                *state = BookingState::Failed;
                return Err(BookingFailure::Cancelled);
            }
        }
        Ok(())
    }

    fn fail<T>(
        &self,
        state: &mut BookingState,
        failure: BookingFailure,
    ) -> Result<T, BookingFailure> {
        warn!("Booking attempt failed in state {}: {}", state, failure);
        *state = BookingState::Failed;
        Err(failure)
    }
}

fn transition(state: &mut BookingState, next: BookingState, token: &str) {
    debug!("Booking attempt {}: {} -> {}", token, state, next);
    *state = next;
}

/// Validate the request shape: `YYYY-MM-DD` date, `HH:MM` time, a client
/// identity and a non-empty idempotency token. Runs before any external
/// call, so malformed input never creates partial state.
fn validate_request(request: &BookingRequest) -> Result<(NaiveDate, u32), BookingFailure> {
    let date = NaiveDate::parse_from_str(&request.date, "%Y-%m-%d")
        .map_err(|_| BookingFailure::InvalidInput(format!("date '{}' is not YYYY-MM-DD", request.date)))?;

    let start_minutes = parse_hhmm(&request.time)
        .ok_or_else(|| BookingFailure::InvalidInput(format!("time '{}' is not HH:MM", request.time)))?;

    if request.client_name.trim().is_empty() {
        return Err(BookingFailure::InvalidInput(
            "client identity is required".to_string(),
        ));
    }

    if request.idempotency_token.trim().is_empty() {
        return Err(BookingFailure::InvalidInput(
            "idempotency token is required".to_string(),
        ));
    }

    Ok((date, start_minutes))
}

/// Interpret a provider-local date and minutes-since-midnight as an instant.
/// Returns `None` for local times skipped by a DST transition.
fn local_instant(date: NaiveDate, minutes: u32, tz: Tz) -> Option<DateTime<Utc>> {
    let naive: NaiveDateTime = date.and_hms_opt(minutes / 60, minutes % 60, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
