//! Session struct definition
//!
//! Represents one admitted connection: its slot, endpoint and display name.

use std::net::SocketAddr;

use crate::types::{EndpointToken, SlotId};

/// Prefix of generated display names
pub const DEFAULT_NAME_PREFIX: &str = "user";

/// Connected session information
///
/// Owns the endpoint `E` for as long as the session is active. Dropping the
/// session closes the endpoint.
#[derive(Debug)]
pub struct Session<E> {
    /// Slot this session occupies
    pub slot: SlotId,
    /// Identity of the endpoint
    pub token: EndpointToken,
    /// The I/O endpoint
    pub endpoint: E,
    /// Peer address and port, fixed at admission
    pub peer: SocketAddr,
    name: String,
}

impl<E> Session<E> {
    /// Create a session carrying its default display name
    pub fn new(slot: SlotId, token: EndpointToken, endpoint: E, peer: SocketAddr) -> Self {
        Self {
            slot,
            token,
            endpoint,
            peer,
            name: default_name(slot),
        }
    }

    /// Current display name (never empty)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the display name, returning the old one
    ///
    /// An empty name falls back to the slot's default name.
    pub fn rename(&mut self, name: String) -> String {
        let name = if name.is_empty() {
            default_name(self.slot)
        } else {
            name
        };
        std::mem::replace(&mut self.name, name)
    }
}

/// Generated display name for a slot, e.g. slot 3 is "user3"
pub fn default_name(slot: SlotId) -> String {
    format!("{}{}", DEFAULT_NAME_PREFIX, slot)
}
