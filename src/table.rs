//! Session table
//!
//! Bounded-capacity registry of active sessions addressed by slot index.

use crate::session::Session;
use crate::types::{EndpointToken, SlotId};

/// Fixed-capacity arena of sessions
///
/// At most one session per slot and never more than `capacity` active
/// sessions. Slot order is the iteration order.
#[derive(Debug)]
pub struct SessionTable<E> {
    slots: Vec<Option<Session<E>>>,
}

impl<E> SessionTable<E> {
    /// Create an empty table with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
        }
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of active sessions
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Check if no session is active
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Check if every slot is taken
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Find a free slot, or None if the table is at capacity
    pub fn allocate(&self) -> Option<SlotId> {
        self.slots.iter().position(Option::is_none).map(SlotId)
    }

    /// Place a session into its (free) slot
    ///
    /// Hands the session back if the slot is out of range or occupied.
    pub fn insert(&mut self, session: Session<E>) -> Result<SlotId, Session<E>> {
        let slot = session.slot;
        match self.slots.get_mut(slot.index()) {
            Some(entry) if entry.is_none() => {
                *entry = Some(session);
                Ok(slot)
            }
            _ => Err(session),
        }
    }

    /// Slot of the active session owning `token`
    pub fn find_by_endpoint(&self, token: EndpointToken) -> Option<SlotId> {
        self.iter().find(|s| s.token == token).map(|s| s.slot)
    }

    /// Clear a slot, returning the session that occupied it
    ///
    /// Releasing an inactive or out-of-range slot is a no-op.
    pub fn release(&mut self, slot: SlotId) -> Option<Session<E>> {
        self.slots.get_mut(slot.index()).and_then(Option::take)
    }

    /// Active session in `slot`
    pub fn get(&self, slot: SlotId) -> Option<&Session<E>> {
        self.slots.get(slot.index()).and_then(Option::as_ref)
    }

    /// Mutable access to the active session in `slot`
    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut Session<E>> {
        self.slots.get_mut(slot.index()).and_then(Option::as_mut)
    }

    /// Active sessions in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Session<E>> {
        self.slots.iter().flatten()
    }

    /// Mutable active sessions in slot order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session<E>> {
        self.slots.iter_mut().flatten()
    }

    /// Remove every session, in slot order
    pub fn drain(&mut self) -> impl Iterator<Item = Session<E>> + '_ {
        self.slots.iter_mut().filter_map(Option::take)
    }
}
