//! Application-level booking orchestration over an `AppointmentRepository`.

mod engine;
mod error;
mod slots;

pub use engine::BookingEngine;
pub use error::BookingError;
pub use slots::SlotCalculator;
