//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Input field a validation failure refers to.
///
/// Callers map this to the form control that needs correcting; the core never
/// renders user-facing messages itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationField {
    Patient,
    Doctor,
    Date,
    Time,
    Reason,
    Notes,
}

impl ValidationField {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationField::Patient => "patient",
            ValidationField::Doctor => "doctor",
            ValidationField::Date => "date",
            ValidationField::Time => "time",
            ValidationField::Reason => "reason",
            ValidationField::Notes => "notes",
        }
    }
}

impl core::fmt::Display for ValidationField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, client-correctable failures. Storage
/// and transport concerns belong to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation.
    #[error("validation failed on {field}: {reason}")]
    Validation {
        field: ValidationField,
        reason: String,
    },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Clinic configuration is unusable (e.g. zero granularity).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DomainError {
    pub fn validation(field: ValidationField, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// The offending field, for validation failures.
    pub fn field(&self) -> Option<ValidationField> {
        match self {
            DomainError::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }
}
