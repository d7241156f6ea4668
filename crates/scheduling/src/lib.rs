//! Appointment scheduling domain module.
//!
//! This crate contains the business rules for clinic appointments, implemented
//! purely as deterministic domain logic (no IO, no storage, no clock reads):
//!
//! - [`slots`]: clinic opening hours and the bookable slot grid
//! - [`appointment`]: the appointment record and its status lifecycle
//! - [`filter`]: read-side filtering over already-loaded appointments

pub mod appointment;
pub mod filter;
pub mod slots;

pub use appointment::{
    Appointment, AppointmentStatus, BookingRequest, NewAppointment, SlotKey, TransitionError,
    UnknownStatus,
};
pub use filter::{filter, AppointmentFilter, StatusFilter};
pub use slots::{ClinicHours, Slots};
