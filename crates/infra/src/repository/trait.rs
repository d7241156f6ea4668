use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use medibook_core::{AppointmentId, UserId};
use medibook_scheduling::{Appointment, NewAppointment};

/// Appointment repository operation error.
///
/// These are **infrastructure errors** as opposed to domain errors. The
/// uniqueness rule on `(doctor, date, time)` surfaces as
/// `ConstraintViolation` regardless of the storage technology underneath.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A write was rejected by a uniqueness rule.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("appointment {0} not found")]
    NotFound(AppointmentId),

    /// Storage could not be reached (pool closed, I/O, poisoned lock).
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be turned back into an appointment.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Persistence for appointments.
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - assign `AppointmentId`s on `insert` (never reuse one)
/// - reject, with `ConstraintViolation`, any `insert` or `update` that would
///   leave two slot-occupying (non-cancelled) appointments sharing the same
///   doctor, date and time
/// - exclude cancelled appointments from `find_booked_times`
/// - return lists ordered by `(date, time, id)`
///
/// Every method is an await point; callers must not assume it completes
/// quickly.
#[async_trait::async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Times already taken for a doctor on a date (cancelled excluded).
    async fn find_booked_times(
        &self,
        doctor_id: UserId,
        date: NaiveDate,
    ) -> Result<BTreeSet<NaiveTime>, RepositoryError>;

    /// Persist a new `Scheduled` appointment and return it with its id.
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, RepositoryError>;

    async fn find_by_id(&self, id: AppointmentId) -> Result<Appointment, RepositoryError>;

    /// Overwrite the mutable fields (status, notes, updated_at) of an existing
    /// appointment.
    async fn update(&self, appointment: &Appointment) -> Result<(), RepositoryError>;

    async fn find_all(&self) -> Result<Vec<Appointment>, RepositoryError>;

    async fn find_by_doctor(&self, doctor_id: UserId) -> Result<Vec<Appointment>, RepositoryError>;

    async fn find_by_creator(&self, user_id: UserId) -> Result<Vec<Appointment>, RepositoryError>;

    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, RepositoryError>;

    /// Physically remove an appointment. Administrative escape hatch only.
    async fn delete(&self, id: AppointmentId) -> Result<(), RepositoryError>;
}

#[async_trait::async_trait]
impl<R> AppointmentRepository for Arc<R>
where
    R: AppointmentRepository + ?Sized,
{
    async fn find_booked_times(
        &self,
        doctor_id: UserId,
        date: NaiveDate,
    ) -> Result<BTreeSet<NaiveTime>, RepositoryError> {
        (**self).find_booked_times(doctor_id, date).await
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, RepositoryError> {
        (**self).insert(appointment).await
    }

    async fn find_by_id(&self, id: AppointmentId) -> Result<Appointment, RepositoryError> {
        (**self).find_by_id(id).await
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), RepositoryError> {
        (**self).update(appointment).await
    }

    async fn find_all(&self) -> Result<Vec<Appointment>, RepositoryError> {
        (**self).find_all().await
    }

    async fn find_by_doctor(&self, doctor_id: UserId) -> Result<Vec<Appointment>, RepositoryError> {
        (**self).find_by_doctor(doctor_id).await
    }

    async fn find_by_creator(&self, user_id: UserId) -> Result<Vec<Appointment>, RepositoryError> {
        (**self).find_by_creator(user_id).await
    }

    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, RepositoryError> {
        (**self).find_by_date(date).await
    }

    async fn delete(&self, id: AppointmentId) -> Result<(), RepositoryError> {
        (**self).delete(id).await
    }
}
