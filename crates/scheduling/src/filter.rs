//! Read-side filtering over an already-loaded appointment list.

use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::appointment::{Appointment, AppointmentStatus, UnknownStatus};

/// Status criterion of the appointment list filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl StatusFilter {
    pub fn matches(self, status: AppointmentStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Scheduled => status == AppointmentStatus::Scheduled,
            StatusFilter::Completed => status == AppointmentStatus::Completed,
            StatusFilter::Cancelled => status == AppointmentStatus::Cancelled,
            StatusFilter::NoShow => status == AppointmentStatus::NoShow,
        }
    }
}

impl From<AppointmentStatus> for StatusFilter {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Scheduled => StatusFilter::Scheduled,
            AppointmentStatus::Completed => StatusFilter::Completed,
            AppointmentStatus::Cancelled => StatusFilter::Cancelled,
            AppointmentStatus::NoShow => StatusFilter::NoShow,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownStatus;

    /// Accepts `All` plus anything [`AppointmentStatus`] parses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse::<AppointmentStatus>().map(StatusFilter::from)
    }
}

/// Combined status + date criteria.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub status: StatusFilter,
    pub date: Option<NaiveDate>,
}

impl AppointmentFilter {
    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.status.matches(appointment.status) && self.date.is_none_or(|d| d == appointment.date)
    }
}

/// The subsequence of `appointments` matching `criteria`, in input order.
pub fn filter(appointments: &[Appointment], criteria: &AppointmentFilter) -> Vec<Appointment> {
    appointments
        .iter()
        .filter(|a| criteria.matches(a))
        .cloned()
        .collect()
}
