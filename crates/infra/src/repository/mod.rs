//! Appointment persistence boundary.
//!
//! The trait makes no storage assumptions. The in-memory implementation is the
//! reference for tests and single-terminal use; the Postgres implementation is
//! what multiple front-desk terminals share.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryAppointmentRepository;
pub use postgres::PostgresAppointmentRepository;
pub use r#trait::{AppointmentRepository, RepositoryError};
