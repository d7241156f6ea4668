use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, instrument};

use medibook_core::UserId;
use medibook_scheduling::ClinicHours;

use crate::repository::{AppointmentRepository, RepositoryError};

/// Free bookable times for a doctor on a date.
///
/// Combines the pure clinic grid with the booked set read from the
/// repository. Holds no mutable state.
#[derive(Debug, Clone)]
pub struct SlotCalculator<R> {
    repository: R,
    hours: ClinicHours,
}

impl<R> SlotCalculator<R> {
    pub fn new(repository: R, hours: ClinicHours) -> Self {
        Self { repository, hours }
    }

    pub fn hours(&self) -> &ClinicHours {
        &self.hours
    }
}

impl<R> SlotCalculator<R>
where
    R: AppointmentRepository,
{
    /// Available times, ascending. Empty when either selection is missing.
    pub async fn available_slots(
        &self,
        doctor_id: Option<UserId>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<NaiveTime>, RepositoryError> {
        match (doctor_id, date) {
            (Some(doctor_id), Some(date)) => self.slots_for(doctor_id, date).await,
            _ => Ok(Vec::new()),
        }
    }

    #[instrument(skip(self), fields(doctor_id = %doctor_id, date = %date), err)]
    pub async fn slots_for(
        &self,
        doctor_id: UserId,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, RepositoryError> {
        let booked = self.repository.find_booked_times(doctor_id, date).await?;
        let available = self.hours.available(&booked);

        debug!(
            booked = booked.len(),
            available = available.len(),
            "computed available slots"
        );
        Ok(available)
    }
}
