//! One controller per session
//!
//! The host owns a [`SessionSlot`] and hands it to whoever builds the level
//! controller. A slot gives out one [`SessionLease`] at a time; the lease is
//! released when the controller holding it is dropped.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::SessionError;

#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    live: Rc<Cell<bool>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, failing if a lease is already live
    pub fn acquire(&self) -> Result<SessionLease, SessionError> {
        if self.live.replace(true) {
            return Err(SessionError::AlreadyActive);
        }
        Ok(SessionLease {
            live: Rc::clone(&self.live),
        })
    }

    pub fn is_active(&self) -> bool {
        self.live.get()
    }
}

/// Proof of holding the session slot
#[derive(Debug)]
pub struct SessionLease {
    live: Rc<Cell<bool>>,
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.live.set(false);
    }
}
