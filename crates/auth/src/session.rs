//! Session boundary.
//!
//! The presentation layer owns the logged-in session. It exposes the current
//! actor through this trait so wiring code can resolve it once per request and
//! hand the resulting [`Actor`] to the scheduling core.

use std::sync::{Arc, RwLock};

use crate::Actor;

/// Supplies the actor of the current session, if anyone is logged in.
pub trait SessionProvider: Send + Sync {
    fn current_actor(&self) -> Option<Actor>;
}

impl<S> SessionProvider for Arc<S>
where
    S: SessionProvider + ?Sized,
{
    fn current_actor(&self) -> Option<Actor> {
        (**self).current_actor()
    }
}

/// Session holder for a single terminal.
///
/// One instance per client process; it is an explicit value owned by the
/// wiring code, not a global.
#[derive(Debug, Default)]
pub struct StaticSession {
    actor: RwLock<Option<Actor>>,
}

impl StaticSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_in(actor: Actor) -> Self {
        Self {
            actor: RwLock::new(Some(actor)),
        }
    }

    pub fn login(&self, actor: Actor) {
        if let Ok(mut guard) = self.actor.write() {
            *guard = Some(actor);
        }
    }

    pub fn logout(&self) {
        if let Ok(mut guard) = self.actor.write() {
            *guard = None;
        }
    }
}

impl SessionProvider for StaticSession {
    fn current_actor(&self) -> Option<Actor> {
        self.actor.read().ok().and_then(|guard| *guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use medibook_core::UserId;

    #[test]
    fn login_and_logout() {
        let session = StaticSession::new();
        assert!(session.current_actor().is_none());

        let actor = Actor::new(UserId::new(), Role::Receptionist);
        session.login(actor);
        assert_eq!(session.current_actor(), Some(actor));

        let shared: Arc<dyn SessionProvider> = Arc::new(StaticSession::logged_in(actor));
        assert_eq!(shared.current_actor().map(|a| a.role), Some(Role::Receptionist));

        session.logout();
        assert!(session.current_actor().is_none());
    }
}
