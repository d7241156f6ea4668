//! Infrastructure layer: appointment storage, configuration, and the booking
//! services that orchestrate them.

pub mod booking;
pub mod config;
pub mod repository;

pub use booking::{BookingEngine, BookingError, SlotCalculator};
pub use config::{ClinicConfig, ConfigError};
pub use repository::{
    AppointmentRepository, InMemoryAppointmentRepository, PostgresAppointmentRepository,
    RepositoryError,
};
