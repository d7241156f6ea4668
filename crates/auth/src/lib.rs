//! `medibook-auth`: identity boundary for the scheduling core.
//!
//! Authentication (login, password verification, session storage) lives
//! outside this workspace. What the scheduling core consumes is the result:
//! an [`Actor`] with exactly one [`Role`], passed explicitly to every call.

pub mod actor;
pub mod roles;
pub mod session;

pub use actor::Actor;
pub use roles::{Role, UnknownRole};
pub use session::{SessionProvider, StaticSession};
