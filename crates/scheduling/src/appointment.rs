use core::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medibook_core::{
    AppointmentId, DomainError, DomainResult, Entity, PatientId, UserId, ValidationField,
};

use crate::slots::ClinicHours;

/// Appointment status lifecycle.
///
/// `Scheduled` is the only non-terminal state. Every transition out of it is
/// final; nothing leaves `Completed`, `Cancelled` or `NoShow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    /// Storage name (lowercase, matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// Display label as shown by the clinic front desk.
    pub fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::NoShow => "No Show",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }

    /// Whether an appointment in this state holds its slot.
    pub fn occupies_slot(self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (
                AppointmentStatus::Scheduled,
                AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
            )
        )
    }

    pub fn transition_to(self, next: AppointmentStatus) -> Result<AppointmentStatus, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl core::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown appointment status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    /// Accepts both storage names (`no_show`) and labels (`No Show`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        AppointmentStatus::ALL
            .into_iter()
            .find(|st| {
                st.as_str().eq_ignore_ascii_case(trimmed) || st.label().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Illegal status change.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot move appointment from {from} to {to}")]
pub struct TransitionError {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
}

/// The `(doctor, date, time)` triple that must be unique among appointments
/// that occupy their slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub doctor_id: UserId,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl core::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "doctor {} on {} at {}", self.doctor_id, self.date, self.time.format("%H:%M"))
    }
}

/// Booking form input, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub patient_id: PatientId,
    pub doctor_id: UserId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRequest {
    pub fn new(
        patient_id: PatientId,
        doctor_id: UserId,
        date: NaiveDate,
        time: NaiveTime,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            patient_id,
            doctor_id,
            date,
            time,
            reason: reason.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn slot(&self) -> SlotKey {
        SlotKey {
            doctor_id: self.doctor_id,
            date: self.date,
            time: self.time,
        }
    }

    /// Field-level checks that need no storage access.
    ///
    /// `today` is `None` when past-date bookings are allowed.
    pub fn validate(&self, hours: &ClinicHours, today: Option<NaiveDate>) -> DomainResult<()> {
        if self.reason.trim().is_empty() {
            return Err(DomainError::validation(
                ValidationField::Reason,
                "reason must not be empty",
            ));
        }

        if let Some(today) = today {
            if self.date < today {
                return Err(DomainError::validation(
                    ValidationField::Date,
                    format!("{} is in the past", self.date),
                ));
            }
        }

        if !hours.is_aligned(self.time) {
            return Err(DomainError::validation(
                ValidationField::Time,
                format!("{} is not on the clinic slot grid", self.time.format("%H:%M")),
            ));
        }

        Ok(())
    }

    /// Turn a validated request into an insertable record.
    pub fn into_new_appointment(self, created_by: UserId, now: DateTime<Utc>) -> NewAppointment {
        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        NewAppointment {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            date: self.date,
            time: self.time,
            reason: self.reason.trim().to_string(),
            notes,
            created_by,
            created_at: now,
        }
    }
}

/// An appointment that has not been persisted yet (no id).
///
/// Always enters storage in `Scheduled` state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: PatientId,
    pub doctor_id: UserId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl NewAppointment {
    pub fn slot(&self) -> SlotKey {
        SlotKey {
            doctor_id: self.doctor_id,
            date: self.date,
            time: self.time,
        }
    }

    /// Attach the storage-assigned id.
    pub fn into_appointment(self, id: AppointmentId) -> Appointment {
        Appointment {
            id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            date: self.date,
            time: self.time,
            reason: self.reason,
            status: AppointmentStatus::Scheduled,
            notes: self.notes,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// A persisted clinic visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: UserId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Appointment {
    type Id = AppointmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Appointment {
    pub fn slot(&self) -> SlotKey {
        SlotKey {
            doctor_id: self.doctor_id,
            date: self.date,
            time: self.time,
        }
    }

    pub fn occupies_slot(&self) -> bool {
        self.status.occupies_slot()
    }

    /// Sort key matching the clinic's schedule order.
    pub fn chronological_key(&self) -> (NaiveDate, NaiveTime, AppointmentId) {
        (self.date, self.time, self.id)
    }

    /// Move to `next`, enforcing the lifecycle.
    ///
    /// On cancellation a non-blank `cancel_reason` is appended to the notes as
    /// `[CANCELLED <timestamp>: <reason>]`. On error nothing is modified.
    pub fn transition(
        &mut self,
        next: AppointmentStatus,
        cancel_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.status = self.status.transition_to(next)?;

        if next == AppointmentStatus::Cancelled {
            if let Some(reason) = cancel_reason.map(str::trim).filter(|r| !r.is_empty()) {
                let marker = format!("[CANCELLED {}: {}]", now.format("%Y-%m-%d %H:%M"), reason);
                self.push_note_line(marker);
            }
        }

        self.updated_at = now;
        Ok(())
    }

    /// Append a free-text line to the notes, keeping prior content.
    pub fn append_note(&mut self, note: &str, now: DateTime<Utc>) -> DomainResult<()> {
        let note = note.trim();
        if note.is_empty() {
            return Err(DomainError::validation(
                ValidationField::Notes,
                "note must not be empty",
            ));
        }
        self.push_note_line(note.to_string());
        self.updated_at = now;
        Ok(())
    }

    fn push_note_line(&mut self, line: String) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{line}"),
            _ => line,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 8, 0, 0).unwrap()
    }

    fn later() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 11, 5, 0).unwrap()
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn test_request() -> BookingRequest {
        BookingRequest::new(PatientId::new(), UserId::new(), test_date(), hm(10, 0), "checkup")
    }

    fn scheduled() -> Appointment {
        test_request()
            .into_new_appointment(UserId::new(), test_time())
            .into_appointment(AppointmentId::new(1))
    }

    #[test]
    fn new_appointments_start_scheduled() {
        let appt = scheduled();
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.created_at, appt.updated_at);
        assert!(appt.occupies_slot());
        assert_eq!(appt.id(), &AppointmentId::new(1));
    }

    #[test]
    fn scheduled_moves_to_every_terminal_state() {
        for next in [
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ] {
            let mut appt = scheduled();
            appt.transition(next, None, later()).unwrap();
            assert_eq!(appt.status, next);
            assert_eq!(appt.updated_at, later());
        }
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for from in AppointmentStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in AppointmentStatus::ALL {
                let mut appt = scheduled();
                appt.status = from;
                let before = appt.clone();

                let err = appt.transition(to, Some("late"), later()).unwrap_err();
                assert_eq!(err, TransitionError { from, to });
                assert_eq!(appt, before, "failed transition must not modify state");
            }
        }
    }

    #[test]
    fn scheduled_to_scheduled_is_rejected() {
        let mut appt = scheduled();
        assert!(appt.transition(AppointmentStatus::Scheduled, None, later()).is_err());
    }

    #[test]
    fn cancellation_reason_is_appended_to_notes() {
        let mut appt = scheduled();
        appt.notes = Some("bring x-rays".to_string());

        appt.transition(AppointmentStatus::Cancelled, Some("patient ill"), later())
            .unwrap();

        let notes = appt.notes.unwrap();
        assert!(notes.starts_with("bring x-rays\n"));
        assert!(notes.ends_with("[CANCELLED 2024-06-01 11:05: patient ill]"));
    }

    #[test]
    fn cancellation_without_reason_leaves_notes_alone() {
        let mut appt = scheduled();
        appt.transition(AppointmentStatus::Cancelled, Some("   "), later())
            .unwrap();
        assert_eq!(appt.notes, None);
        assert!(!appt.occupies_slot());
    }

    #[test]
    fn cancel_reason_ignored_for_other_transitions() {
        let mut appt = scheduled();
        appt.transition(AppointmentStatus::Completed, Some("unused"), later())
            .unwrap();
        assert_eq!(appt.notes, None);
    }

    #[test]
    fn append_note_keeps_history() {
        let mut appt = scheduled();
        appt.append_note("first", later()).unwrap();
        appt.append_note("second", later()).unwrap();
        assert_eq!(appt.notes.as_deref(), Some("first\nsecond"));

        let err = appt.append_note("  ", later()).unwrap_err();
        assert_eq!(err.field(), Some(ValidationField::Notes));
    }

    #[test]
    fn request_validation_reports_the_field() {
        let hours = ClinicHours::default();

        let mut blank = test_request();
        blank.reason = "  ".to_string();
        assert_eq!(
            blank.validate(&hours, None).unwrap_err().field(),
            Some(ValidationField::Reason)
        );

        let past = test_request();
        let today = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert_eq!(
            past.validate(&hours, Some(today)).unwrap_err().field(),
            Some(ValidationField::Date)
        );
        assert!(past.validate(&hours, None).is_ok());

        let mut unaligned = test_request();
        unaligned.time = hm(10, 7);
        assert_eq!(
            unaligned.validate(&hours, None).unwrap_err().field(),
            Some(ValidationField::Time)
        );

        let mut after_hours = test_request();
        after_hours.time = hm(18, 0);
        assert_eq!(
            after_hours.validate(&hours, None).unwrap_err().field(),
            Some(ValidationField::Time)
        );
    }

    #[test]
    fn request_is_trimmed_into_new_appointment() {
        let request = BookingRequest {
            reason: "  fever ".to_string(),
            notes: Some("   ".to_string()),
            ..test_request()
        };
        let new = request.into_new_appointment(UserId::new(), test_time());
        assert_eq!(new.reason, "fever");
        assert_eq!(new.notes, None);
    }

    #[test]
    fn status_parses_labels_and_storage_names() {
        assert_eq!("No Show".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::NoShow);
        assert_eq!("no_show".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::NoShow);
        assert_eq!("cancelled".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Cancelled);
        assert!("Rescheduled".parse::<AppointmentStatus>().is_err());

        for status in AppointmentStatus::ALL {
            assert_eq!(status.as_str().parse::<AppointmentStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
