//! Error types shared by the store, account and consultation services.

use thiserror::Error;

use crate::models::ConsultationStatus;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt JSON under '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Every refusal a service can hand back to the caller.
///
/// Guard failures (address, window, transition) leave the store untouched.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("In-person consultations need address, city and state")]
    IncompleteAddress,

    #[error("Consultations must be booked at least {notice_hours} hours ahead ({hours:.1}h remaining)")]
    SchedulingTooSoon { hours: f64, notice_hours: i64 },

    #[error("Cannot change a consultation less than {notice_hours} hours before it starts ({hours:.1}h remaining)")]
    WindowClosed { hours: f64, notice_hours: i64 },

    #[error("Consultation not found: {0}")]
    NotFound(String),

    #[error("Cannot move a consultation from {from} to {to}")]
    InvalidTransition {
        from: ConsultationStatus,
        to: ConsultationStatus,
    },

    #[error("Consultation is already {0}")]
    AlreadyClosed(ConsultationStatus),

    #[error("E-mail already registered: {0}")]
    EmailTaken(String),

    #[error("Incorrect e-mail or password")]
    InvalidCredentials,

    #[error("No user is logged in")]
    NotAuthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Failures the user caused and can fix by entering different data.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ServiceError::Validation(_)
                | ServiceError::IncompleteAddress
                | ServiceError::SchedulingTooSoon { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
