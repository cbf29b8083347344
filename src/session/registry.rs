//! Process-wide mapping from charge point id to its live `Session`.
//!
//! Mirrors the teacher's `application::session::SessionRegistry`: a single
//! `DashMap` guarding short critical sections, never held across an await.
//! The duplicate-upgrade question `spec.md` §9 leaves open is resolved here
//! as reject-new (see `DESIGN.md`): `create` fails rather than displacing an
//! existing session.

use std::sync::Arc;

use dashmap::DashMap;

use crate::support::errors::RegistryError;

use super::mediator::Session;

/// At most one live `Session` per charge point id at any instant.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a freshly-created session. Fails with `DuplicateSession` if
    /// one is already live for this charge point id — the caller (the
    /// acceptor) is expected to close the new socket without touching the
    /// existing session.
    pub fn create(&self, session: Arc<Session>) -> Result<(), RegistryError> {
        let id = session.charge_point_id.clone();
        match self.sessions.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RegistryError::DuplicateSession(id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, charge_point_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(charge_point_id).map(|entry| entry.value().clone())
    }

    /// Idempotent: removing an id that isn't present is a no-op. The
    /// acceptor is the only caller, and only on charger-socket close.
    pub fn remove(&self, charge_point_id: &str) {
        self.sessions.remove(charge_point_id);
    }

    pub fn connected_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
