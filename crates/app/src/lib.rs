//! MediBook bootstrap: wires configuration, storage and the booking engine.

pub mod services;

pub use services::{build_services, build_services_with, AppServices, Engine, StoreSettings};
