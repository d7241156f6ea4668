use serde::{Deserialize, Serialize};

use medibook_core::UserId;

use crate::Role;

/// The authenticated entity performing an operation.
///
/// Constructed by the identity collaborator after login and threaded
/// explicitly through every scheduling call; there is no process-wide
/// "current user".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn doctor(id: UserId) -> Self {
        Self::new(id, Role::Doctor)
    }

    pub fn receptionist(id: UserId) -> Self {
        Self::new(id, Role::Receptionist)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}
