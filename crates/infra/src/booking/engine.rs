//! Booking orchestration.
//!
//! ```text
//! BookingRequest
//!   ↓
//! 1. Validate fields (reason, date policy, grid alignment)
//!   ↓
//! 2. Check the slot against current availability
//!   ↓
//! 3. Insert (repository uniqueness rule arbitrates races)
//! ```
//!
//! Status changes are read-modify-write against a fresh read of the record.
//! No in-process lock is taken; the repository constraint is the only
//! guard against double booking.

use chrono::{NaiveDate, NaiveTime};
use tracing::{info, instrument, warn};

use medibook_auth::{Actor, Role};
use medibook_core::{AppointmentId, Clock, UserId, ValidationField};
use medibook_scheduling::{Appointment, AppointmentStatus, BookingRequest, ClinicHours};

use super::error::BookingError;
use super::slots::SlotCalculator;
use crate::config::ClinicConfig;
use crate::repository::{AppointmentRepository, RepositoryError};

/// Appointment booking engine.
///
/// ## Generic Parameters
///
/// - `R`: appointment repository (`Arc<InMemoryAppointmentRepository>` in
///   tests, `PostgresAppointmentRepository` in production)
/// - `C`: clock used for `created_at`/`updated_at` and the past-date policy
#[derive(Debug, Clone)]
pub struct BookingEngine<R, C> {
    slots: SlotCalculator<R>,
    repository: R,
    clock: C,
    reject_past_dates: bool,
}

impl<R, C> BookingEngine<R, C>
where
    R: Clone,
{
    pub fn new(repository: R, clock: C, config: ClinicConfig) -> Self {
        Self {
            slots: SlotCalculator::new(repository.clone(), config.hours),
            repository,
            clock,
            reject_past_dates: config.reject_past_dates,
        }
    }
}

impl<R, C> BookingEngine<R, C> {
    pub fn hours(&self) -> &ClinicHours {
        self.slots.hours()
    }

    pub fn slot_calculator(&self) -> &SlotCalculator<R> {
        &self.slots
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

impl<R, C> BookingEngine<R, C>
where
    R: AppointmentRepository,
    C: Clock,
{
    /// Free times for a doctor on a date; empty if either is unselected.
    pub async fn available_slots(
        &self,
        doctor_id: Option<UserId>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<NaiveTime>, BookingError> {
        Ok(self.slots.available_slots(doctor_id, date).await?)
    }

    /// Book a new appointment on behalf of `actor`.
    ///
    /// Nothing is written unless every check passes. A concurrent booking
    /// that wins the insert race turns this call into `SlotConflict`.
    #[instrument(
        skip(self, request),
        fields(
            actor_id = %actor.id,
            doctor_id = %request.doctor_id,
            date = %request.date,
            time = %request.time,
        ),
        err
    )]
    pub async fn book(
        &self,
        request: BookingRequest,
        actor: &Actor,
    ) -> Result<Appointment, BookingError> {
        let today = self.reject_past_dates.then(|| self.clock.today());
        request.validate(self.slots.hours(), today)?;

        let slot = request.slot();
        let available = self.slots.slots_for(slot.doctor_id, slot.date).await?;
        if available.binary_search(&slot.time).is_err() {
            return Err(BookingError::validation(
                ValidationField::Time,
                format!("{} is no longer available", slot.time.format("%H:%M")),
            ));
        }

        let new = request.into_new_appointment(actor.id, self.clock.now());
        let appointment = match self.repository.insert(new).await {
            Ok(appointment) => appointment,
            Err(RepositoryError::ConstraintViolation(detail)) => {
                warn!(%slot, %detail, "lost booking race");
                return Err(BookingError::SlotConflict {
                    detail: slot.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        info!(appointment_id = %appointment.id, "appointment booked");
        Ok(appointment)
    }

    /// Move an appointment to `new_status`.
    ///
    /// The record is re-read first; the lifecycle check runs against what is
    /// stored now, not what the caller last saw.
    #[instrument(skip(self, cancel_reason), fields(appointment_id = %id, to = %new_status), err)]
    pub async fn update_status(
        &self,
        id: AppointmentId,
        new_status: AppointmentStatus,
        cancel_reason: Option<&str>,
    ) -> Result<Appointment, BookingError> {
        let mut appointment = self.repository.find_by_id(id).await?;
        let from = appointment.status;

        appointment.transition(new_status, cancel_reason, self.clock.now())?;
        self.repository.update(&appointment).await?;

        info!(%from, to = %appointment.status, "appointment status changed");
        Ok(appointment)
    }

    pub async fn complete(&self, id: AppointmentId) -> Result<Appointment, BookingError> {
        self.update_status(id, AppointmentStatus::Completed, None).await
    }

    pub async fn cancel(
        &self,
        id: AppointmentId,
        reason: Option<&str>,
    ) -> Result<Appointment, BookingError> {
        self.update_status(id, AppointmentStatus::Cancelled, reason).await
    }

    pub async fn mark_no_show(&self, id: AppointmentId) -> Result<Appointment, BookingError> {
        self.update_status(id, AppointmentStatus::NoShow, None).await
    }

    /// Add a line to the notes without touching the status.
    #[instrument(skip(self, note), fields(appointment_id = %id), err)]
    pub async fn append_note(&self, id: AppointmentId, note: &str) -> Result<Appointment, BookingError> {
        let mut appointment = self.repository.find_by_id(id).await?;
        appointment.append_note(note, self.clock.now())?;
        self.repository.update(&appointment).await?;
        Ok(appointment)
    }

    /// The appointments relevant to `actor`'s role.
    ///
    /// Doctors see their own schedule; front desk staff see what they booked.
    /// Patients get nothing until self-service exists.
    #[instrument(skip(self), fields(actor_id = %actor.id, role = %actor.role), err)]
    pub async fn list_for(&self, actor: &Actor) -> Result<Vec<Appointment>, BookingError> {
        let list = match actor.role {
            Role::Doctor => self.repository.find_by_doctor(actor.id).await?,
            Role::Admin | Role::Receptionist => self.repository.find_by_creator(actor.id).await?,
            Role::Patient => Vec::new(),
        };
        Ok(list)
    }

    /// Every appointment in the system. Admin only.
    pub async fn list_all(&self, actor: &Actor) -> Result<Vec<Appointment>, BookingError> {
        match actor.role {
            Role::Admin => Ok(self.repository.find_all().await?),
            role => Err(BookingError::Forbidden { role }),
        }
    }

    pub async fn list_on(&self, date: NaiveDate) -> Result<Vec<Appointment>, BookingError> {
        Ok(self.repository.find_by_date(date).await?)
    }

    /// Hard delete. Admin only; prefer `cancel` for normal workflows.
    #[instrument(skip(self), fields(appointment_id = %id, actor_id = %actor.id), err)]
    pub async fn purge(&self, id: AppointmentId, actor: &Actor) -> Result<(), BookingError> {
        if actor.role != Role::Admin {
            return Err(BookingError::Forbidden { role: actor.role });
        }
        self.repository.delete(id).await?;
        warn!("appointment purged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryAppointmentRepository;
    use medibook_core::{FixedClock, PatientId};
    use std::sync::Arc;

    type Engine = BookingEngine<Arc<InMemoryAppointmentRepository>, FixedClock>;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// Engine whose clock reads 2024-06-01 08:00 UTC.
    fn engine() -> Engine {
        BookingEngine::new(
            Arc::new(InMemoryAppointmentRepository::new()),
            FixedClock::at(day(1), hm(8, 0)),
            ClinicConfig::default(),
        )
    }

    fn request(doctor: UserId, date: NaiveDate, time: NaiveTime) -> BookingRequest {
        BookingRequest::new(PatientId::new(), doctor, date, time, "annual checkup")
    }

    #[tokio::test]
    async fn book_persists_a_scheduled_appointment() {
        let engine = engine();
        let desk = Actor::receptionist(UserId::new());
        let doctor = UserId::new();

        let appt = engine
            .book(request(doctor, day(1), hm(10, 0)).with_notes("  bring x-rays "), &desk)
            .await
            .unwrap();

        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.created_by, desk.id);
        assert_eq!(appt.notes.as_deref(), Some("bring x-rays"));
        assert_eq!(appt.created_at, appt.updated_at);
        assert_eq!(engine.repository().find_by_id(appt.id).await.unwrap(), appt);

        let slots = engine.available_slots(Some(doctor), Some(day(1))).await.unwrap();
        assert!(!slots.contains(&hm(10, 0)));
        assert_eq!(slots.len(), 35);
    }

    #[tokio::test]
    async fn validation_reports_the_offending_field() {
        let engine = engine();
        let desk = Actor::receptionist(UserId::new());
        let doctor = UserId::new();

        let blank = BookingRequest::new(PatientId::new(), doctor, day(1), hm(10, 0), "   ");
        let err = engine.book(blank, &desk).await.unwrap_err();
        assert_eq!(err.field(), Some(ValidationField::Reason));

        let past = request(doctor, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(), hm(10, 0));
        let err = engine.book(past, &desk).await.unwrap_err();
        assert_eq!(err.field(), Some(ValidationField::Date));

        let off_grid = request(doctor, day(1), hm(10, 5));
        let err = engine.book(off_grid, &desk).await.unwrap_err();
        assert_eq!(err.field(), Some(ValidationField::Time));

        let after_close = request(doctor, day(1), hm(18, 0));
        let err = engine.book(after_close, &desk).await.unwrap_err();
        assert_eq!(err.field(), Some(ValidationField::Time));

        assert!(engine.repository().is_empty());
    }

    #[tokio::test]
    async fn past_dates_allowed_when_policy_is_off() {
        let config = ClinicConfig {
            reject_past_dates: false,
            ..ClinicConfig::default()
        };
        let engine = BookingEngine::new(
            Arc::new(InMemoryAppointmentRepository::new()),
            FixedClock::at(day(10), hm(8, 0)),
            config,
        );

        let appt = engine
            .book(request(UserId::new(), day(1), hm(9, 0)), &Actor::admin(UserId::new()))
            .await
            .unwrap();
        assert_eq!(appt.date, day(1));
    }

    #[tokio::test]
    async fn taken_slot_is_a_time_validation_error() {
        let engine = engine();
        let desk = Actor::receptionist(UserId::new());
        let doctor = UserId::new();

        engine.book(request(doctor, day(2), hm(11, 0)), &desk).await.unwrap();
        let err = engine
            .book(request(doctor, day(2), hm(11, 0)), &desk)
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some(ValidationField::Time));
    }

    #[tokio::test]
    async fn lifecycle_moves_out_of_scheduled_once() {
        let engine = engine();
        let desk = Actor::receptionist(UserId::new());
        let appt = engine
            .book(request(UserId::new(), day(3), hm(9, 30)), &desk)
            .await
            .unwrap();

        let done = engine.complete(appt.id).await.unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);

        for next in AppointmentStatus::ALL {
            let err = engine.update_status(appt.id, next, None).await.unwrap_err();
            assert_eq!(
                err,
                BookingError::InvalidTransition {
                    from: AppointmentStatus::Completed,
                    to: next,
                }
            );
        }
        let stored = engine.repository().find_by_id(appt.id).await.unwrap();
        assert_eq!(stored.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn cancel_appends_reason_and_frees_slot() {
        let engine = engine();
        let desk = Actor::receptionist(UserId::new());
        let doctor = UserId::new();
        let appt = engine
            .book(request(doctor, day(4), hm(14, 0)).with_notes("first visit"), &desk)
            .await
            .unwrap();

        let cancelled = engine.cancel(appt.id, Some("patient ill")).await.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(
            cancelled.notes.as_deref(),
            Some("first visit\n[CANCELLED 2024-06-01 08:00: patient ill]")
        );

        let slots = engine.available_slots(Some(doctor), Some(day(4))).await.unwrap();
        assert!(slots.contains(&hm(14, 0)));
        engine.book(request(doctor, day(4), hm(14, 0)), &desk).await.unwrap();
    }

    #[tokio::test]
    async fn no_show_keeps_the_slot_taken() {
        let engine = engine();
        let desk = Actor::receptionist(UserId::new());
        let doctor = UserId::new();
        let appt = engine.book(request(doctor, day(5), hm(16, 45)), &desk).await.unwrap();

        engine.mark_no_show(appt.id).await.unwrap();
        let slots = engine.available_slots(Some(doctor), Some(day(5))).await.unwrap();
        assert!(!slots.contains(&hm(16, 45)));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let engine = engine();
        let id = AppointmentId::new(404);

        assert_eq!(engine.complete(id).await.unwrap_err(), BookingError::NotFound { id });
        assert_eq!(
            engine.append_note(id, "hello").await.unwrap_err(),
            BookingError::NotFound { id }
        );
        assert_eq!(
            engine.purge(id, &Actor::admin(UserId::new())).await.unwrap_err(),
            BookingError::NotFound { id }
        );
    }

    #[tokio::test]
    async fn append_note_preserves_status_and_prior_notes() {
        let engine = engine();
        let desk = Actor::receptionist(UserId::new());
        let appt = engine
            .book(request(UserId::new(), day(6), hm(12, 0)).with_notes("allergic to latex"), &desk)
            .await
            .unwrap();

        let noted = engine.append_note(appt.id, "called to confirm").await.unwrap();
        assert_eq!(noted.status, AppointmentStatus::Scheduled);
        assert!(noted.notes.as_deref().unwrap().starts_with("allergic to latex\n"));

        let err = engine.append_note(appt.id, "  ").await.unwrap_err();
        assert_eq!(err.field(), Some(ValidationField::Notes));
    }

    #[tokio::test]
    async fn listing_depends_on_role() {
        let engine = engine();
        let desk = Actor::receptionist(UserId::new());
        let admin = Actor::admin(UserId::new());
        let doctor = Actor::doctor(UserId::new());

        let a = engine.book(request(doctor.id, day(2), hm(15, 0)), &desk).await.unwrap();
        let b = engine.book(request(doctor.id, day(1), hm(9, 0)), &admin).await.unwrap();
        let c = engine.book(request(UserId::new(), day(1), hm(9, 0)), &desk).await.unwrap();

        let ids = |v: Vec<Appointment>| v.into_iter().map(|a| a.id).collect::<Vec<_>>();

        assert_eq!(ids(engine.list_for(&doctor).await.unwrap()), vec![b.id, a.id]);
        assert_eq!(ids(engine.list_for(&desk).await.unwrap()), vec![c.id, a.id]);
        assert_eq!(ids(engine.list_for(&admin).await.unwrap()), vec![b.id]);

        let patient = Actor::new(UserId::new(), Role::Patient);
        assert!(engine.list_for(&patient).await.unwrap().is_empty());

        assert_eq!(engine.list_all(&admin).await.unwrap().len(), 3);
        assert_eq!(
            engine.list_all(&desk).await.unwrap_err(),
            BookingError::Forbidden { role: Role::Receptionist }
        );

        assert_eq!(engine.list_on(day(1)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn purge_is_admin_only() {
        let engine = engine();
        let desk = Actor::receptionist(UserId::new());
        let appt = engine
            .book(request(UserId::new(), day(1), hm(9, 0)), &desk)
            .await
            .unwrap();

        assert_eq!(
            engine.purge(appt.id, &desk).await.unwrap_err(),
            BookingError::Forbidden { role: Role::Receptionist }
        );
        engine.purge(appt.id, &Actor::admin(UserId::new())).await.unwrap();
        assert!(engine.repository().is_empty());
    }
}
