//! Typed failure taxonomy for the booking workflow and its collaborators.
//!
//! Callers branch on failure kinds, never on message text. `RollbackFailed`
//! stays a distinct kind: it means a durable appointment may exist without a
//! matching confirmation and needs out-of-band reconciliation.

use thiserror::Error;

/// The orchestrator step a timeout or transport error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStep {
    ResolvingProviderIdentity,
    ResolvingServiceIdentity,
    CreatingPrimaryRecord,
    ConfirmingWithSecondaryService,
    CompensatingRollback,
}

impl std::fmt::Display for BookingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BookingStep::ResolvingProviderIdentity => "resolving provider identity",
            BookingStep::ResolvingServiceIdentity => "resolving service identity",
            BookingStep::CreatingPrimaryRecord => "creating primary record",
            BookingStep::ConfirmingWithSecondaryService => "confirming with secondary service",
            BookingStep::CompensatingRollback => "compensating rollback",
        };
        f.write_str(name)
    }
}

/// Terminal failure of a booking attempt.
#[derive(Debug, Error)]
pub enum BookingFailure {
    #[error("invalid booking input: {0}")]
    InvalidInput(String),

    #[error("identity not found: {0}")]
    IdentityNotFound(String),

    #[error("identity resolution failed: {0}")]
    IdentityResolutionFailed(String),

    #[error("primary appointment write failed: {0}")]
    PrimaryWriteFailed(String),

    #[error("secondary confirmation failed ({code}): primary record rolled back")]
    SecondaryConfirmFailed { code: ConfirmErrorCode },

    #[error("rollback of appointment {appointment_id} failed: {detail}")]
    RollbackFailed {
        appointment_id: String,
        detail: String,
    },

    #[error("timed out while {0}")]
    Timeout(BookingStep),

    #[error("booking attempt cancelled before the primary write")]
    Cancelled,
}

impl BookingFailure {
    /// Stable kind name for logs and response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingFailure::InvalidInput(_) => "invalid_input",
            BookingFailure::IdentityNotFound(_) => "identity_not_found",
            BookingFailure::IdentityResolutionFailed(_) => "identity_resolution_failed",
            BookingFailure::PrimaryWriteFailed(_) => "primary_write_failed",
            BookingFailure::SecondaryConfirmFailed { .. } => "secondary_confirm_failed",
            BookingFailure::RollbackFailed { .. } => "rollback_failed",
            BookingFailure::Timeout(_) => "timeout",
            BookingFailure::Cancelled => "cancelled",
        }
    }
}

/// Structured error code returned by the secondary confirmation service.
///
/// The orchestrator switches on this code; free-form message text from the
/// far side is carried for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmErrorCode {
    RecipientNotFound,
    Rejected,
    Unavailable,
    Internal,
}

impl std::fmt::Display for ConfirmErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            ConfirmErrorCode::RecipientNotFound => "recipient_not_found",
            ConfirmErrorCode::Rejected => "rejected",
            ConfirmErrorCode::Unavailable => "unavailable",
            ConfirmErrorCode::Internal => "internal",
        };
        f.write_str(code)
    }
}

/// Failure of a secondary confirmation call.
#[derive(Debug, Error)]
#[error("confirmation service returned {code}: {message}")]
pub struct ConfirmError {
    pub code: ConfirmErrorCode,
    pub message: String,
}

/// Error from the remote scheduling backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("backend response could not be decoded: {0}")]
    Decode(String),
}

/// Error from the primary appointment store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("store mutex poisoned")]
    Poisoned,

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("appointment not found: {0}")]
    NotFound(String),
}
