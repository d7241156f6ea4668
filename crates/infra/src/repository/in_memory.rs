use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use chrono::{NaiveDate, NaiveTime};

use medibook_core::{AppointmentId, UserId};
use medibook_scheduling::{Appointment, NewAppointment, SlotKey};

use super::r#trait::{AppointmentRepository, RepositoryError};

#[derive(Debug, Default)]
struct State {
    last_id: i64,
    rows: BTreeMap<AppointmentId, Appointment>,
}

impl State {
    /// The slot-occupying appointment holding `slot`, other than `except`.
    fn holder_of(&self, slot: SlotKey, except: Option<AppointmentId>) -> Option<&Appointment> {
        self.rows
            .values()
            .find(|a| Some(a.id) != except && a.occupies_slot() && a.slot() == slot)
    }

    fn select(&self, mut pred: impl FnMut(&Appointment) -> bool) -> Vec<Appointment> {
        let mut out: Vec<Appointment> = self.rows.values().filter(|a| pred(a)).cloned().collect();
        out.sort_by_key(Appointment::chronological_key);
        out
    }
}

/// In-memory appointment repository.
///
/// Intended for tests/dev and single-terminal use. The uniqueness rule is
/// checked and the row written under one write lock, so concurrent inserts for
/// the same slot are serialized and exactly one wins.
#[derive(Debug, Default)]
pub struct InMemoryAppointmentRepository {
    state: RwLock<State>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> Result<T, RepositoryError> {
        let state = self
            .state
            .read()
            .map_err(|_| RepositoryError::Unavailable("lock poisoned".to_string()))?;
        Ok(f(&state))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| RepositoryError::Unavailable("lock poisoned".to_string()))?;
        f(&mut state)
    }
}

#[async_trait::async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn find_booked_times(
        &self,
        doctor_id: UserId,
        date: NaiveDate,
    ) -> Result<BTreeSet<NaiveTime>, RepositoryError> {
        self.read(|s| {
            s.rows
                .values()
                .filter(|a| a.doctor_id == doctor_id && a.date == date && a.occupies_slot())
                .map(|a| a.time)
                .collect()
        })
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, RepositoryError> {
        self.write(|s| {
            let slot = appointment.slot();
            if let Some(existing) = s.holder_of(slot, None) {
                return Err(RepositoryError::ConstraintViolation(format!(
                    "{slot} already held by appointment {}",
                    existing.id
                )));
            }

            s.last_id += 1;
            let stored = appointment.into_appointment(AppointmentId::new(s.last_id));
            s.rows.insert(stored.id, stored.clone());
            Ok(stored)
        })
    }

    async fn find_by_id(&self, id: AppointmentId) -> Result<Appointment, RepositoryError> {
        self.read(|s| s.rows.get(&id).cloned())?
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), RepositoryError> {
        self.write(|s| {
            if !s.rows.contains_key(&appointment.id) {
                return Err(RepositoryError::NotFound(appointment.id));
            }

            if appointment.occupies_slot() {
                let slot = appointment.slot();
                if let Some(existing) = s.holder_of(slot, Some(appointment.id)) {
                    return Err(RepositoryError::ConstraintViolation(format!(
                        "{slot} already held by appointment {}",
                        existing.id
                    )));
                }
            }

            s.rows.insert(appointment.id, appointment.clone());
            Ok(())
        })
    }

    async fn find_all(&self) -> Result<Vec<Appointment>, RepositoryError> {
        self.read(|s| s.select(|_| true))
    }

    async fn find_by_doctor(&self, doctor_id: UserId) -> Result<Vec<Appointment>, RepositoryError> {
        self.read(|s| s.select(|a| a.doctor_id == doctor_id))
    }

    async fn find_by_creator(&self, user_id: UserId) -> Result<Vec<Appointment>, RepositoryError> {
        self.read(|s| s.select(|a| a.created_by == user_id))
    }

    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, RepositoryError> {
        self.read(|s| s.select(|a| a.date == date))
    }

    async fn delete(&self, id: AppointmentId) -> Result<(), RepositoryError> {
        self.write(|s| {
            s.rows
                .remove(&id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound(id))
        })
    }
}
