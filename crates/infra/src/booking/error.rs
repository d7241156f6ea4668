use thiserror::Error;

use medibook_auth::Role;
use medibook_core::{AppointmentId, DomainError, ValidationField};
use medibook_scheduling::{AppointmentStatus, TransitionError};

use crate::repository::RepositoryError;

/// Failure of a booking engine operation.
///
/// Everything except `RepositoryUnavailable` is deterministic: retrying the
/// same call against the same state fails the same way.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Input rejected; `field` names the control to correct.
    #[error("invalid {field}: {reason}")]
    Validation {
        field: ValidationField,
        reason: String,
    },

    /// Another booking took the slot between the availability check and the
    /// insert.
    #[error("slot already booked: {detail}")]
    SlotConflict { detail: String },

    #[error("cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("appointment {id} not found")]
    NotFound { id: AppointmentId },

    #[error("{role} is not allowed to perform this operation")]
    Forbidden { role: Role },

    /// Storage failed or returned unreadable data. Safe to retry.
    #[error("repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error(transparent)]
    Domain(DomainError),
}

impl BookingError {
    pub fn validation(field: ValidationField, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::RepositoryUnavailable(_))
    }

    /// The offending field, for validation failures.
    pub fn field(&self) -> Option<ValidationField> {
        match self {
            BookingError::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }
}

impl From<RepositoryError> for BookingError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::ConstraintViolation(detail) => BookingError::SlotConflict { detail },
            RepositoryError::NotFound(id) => BookingError::NotFound { id },
            RepositoryError::Unavailable(msg) => BookingError::RepositoryUnavailable(msg),
            RepositoryError::Corrupt(msg) => BookingError::RepositoryUnavailable(msg),
        }
    }
}

impl From<DomainError> for BookingError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation { field, reason } => BookingError::Validation { field, reason },
            other => BookingError::Domain(other),
        }
    }
}

impl From<TransitionError> for BookingError {
    fn from(value: TransitionError) -> Self {
        BookingError::InvalidTransition {
            from: value.from,
            to: value.to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_errors_map_by_kind() {
        let id = AppointmentId::new(7);

        assert!(matches!(
            BookingError::from(RepositoryError::ConstraintViolation("dup".into())),
            BookingError::SlotConflict { .. }
        ));
        assert_eq!(
            BookingError::from(RepositoryError::NotFound(id)),
            BookingError::NotFound { id }
        );
        assert!(BookingError::from(RepositoryError::Unavailable("down".into())).is_retryable());
        assert!(BookingError::from(RepositoryError::Corrupt("bad row".into())).is_retryable());
    }

    #[test]
    fn only_storage_failures_are_retryable() {
        let deterministic = [
            BookingError::validation(ValidationField::Reason, "empty"),
            BookingError::SlotConflict {
                detail: "taken".into(),
            },
            BookingError::Forbidden {
                role: Role::Receptionist,
            },
            BookingError::NotFound {
                id: AppointmentId::new(1),
            },
        ];
        assert!(deterministic.iter().all(|e| !e.is_retryable()));
    }

    #[test]
    fn domain_validation_keeps_its_field() {
        let err = BookingError::from(DomainError::validation(ValidationField::Date, "past"));
        assert_eq!(err.field(), Some(ValidationField::Date));

        let err = BookingError::from(DomainError::invalid_id("x"));
        assert!(matches!(err, BookingError::Domain(DomainError::InvalidId(_))));
        assert_eq!(err.field(), None);
    }

    #[test]
    fn transition_error_carries_states() {
        let err: BookingError = AppointmentStatus::Completed
            .transition_to(AppointmentStatus::Cancelled)
            .unwrap_err()
            .into();
        assert_eq!(
            err,
            BookingError::InvalidTransition {
                from: AppointmentStatus::Completed,
                to: AppointmentStatus::Cancelled,
            }
        );
        assert_eq!(err.to_string(), "cannot move appointment from Completed to Cancelled");
    }
}
