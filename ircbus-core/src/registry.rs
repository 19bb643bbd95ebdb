//! Session registry
//!
//! A bijection between session names and the opaque ids the protocol
//! capability assigns, plus reservation slots for starts in flight. The
//! registry carries no lock of its own: the manager owns it behind its
//! single state mutex so registry contents, the draining flag and the
//! last-one-out decision always change together.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ManagerError;
use crate::network::SessionId;
use crate::session::Session;

enum Slot {
    /// Name claimed by a start in flight; no session committed yet
    Reserved,
    Active(Arc<Session>),
}

/// Name <-> id bijection of live sessions
#[derive(Default)]
pub struct Registry {
    names: HashMap<String, Slot>,
    ids: HashMap<SessionId, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` before session construction begins, so two
    /// concurrent starts of the same name cannot race to completion.
    pub fn reserve(&mut self, name: &str) -> Result<(), ManagerError> {
        if self.names.contains_key(name) {
            return Err(ManagerError::AlreadyExists(name.to_string()));
        }
        self.names.insert(name.to_string(), Slot::Reserved);
        Ok(())
    }

    /// Commit a constructed session under its reserved name, completing
    /// both directions of the bijection.
    pub fn commit(&mut self, name: &str, session: Arc<Session>) {
        debug_assert!(matches!(self.names.get(name), Some(Slot::Reserved)));
        self.ids.insert(session.id(), name.to_string());
        self.names.insert(name.to_string(), Slot::Active(session));
    }

    /// Release a reservation after a failed start; the registry is left
    /// exactly as before the reservation.
    pub fn abort(&mut self, name: &str) {
        debug_assert!(matches!(self.names.get(name), Some(Slot::Reserved)));
        self.names.remove(name);
    }

    /// The committed session registered under `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<Arc<Session>> {
        match self.names.get(name) {
            Some(Slot::Active(session)) => Some(Arc::clone(session)),
            _ => None,
        }
    }

    /// Remove both directions for `name`.
    pub fn remove_by_name(&mut self, name: &str) -> Option<Arc<Session>> {
        match self.names.remove(name) {
            Some(Slot::Active(session)) => {
                self.ids.remove(&session.id());
                Some(session)
            }
            Some(Slot::Reserved) => {
                // Reservations are not removable through this path.
                self.names.insert(name.to_string(), Slot::Reserved);
                None
            }
            None => None,
        }
    }

    /// Remove both directions for `id`.
    pub fn remove_by_id(&mut self, id: SessionId) -> Option<(String, Arc<Session>)> {
        let name = self.ids.remove(&id)?;
        match self.names.remove(&name) {
            Some(Slot::Active(session)) => Some((name, session)),
            _ => None,
        }
    }

    /// Names of committed sessions; reservations are invisible to
    /// readers.
    pub fn names(&self) -> Vec<String> {
        self.names
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Active(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// All committed sessions.
    pub fn active(&self) -> Vec<Arc<Session>> {
        self.names
            .values()
            .filter_map(|slot| match slot {
                Slot::Active(session) => Some(Arc::clone(session)),
                Slot::Reserved => None,
            })
            .collect()
    }

    /// Number of entries, reservations included: a reserved start is a
    /// session that will still have to drain.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
