//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `SlotId`: position of a session in the session table
//! - `EndpointToken`: identity of an accepted connection

/// Session table slot index (newtype pattern)
///
/// Stable identity of a session while it is active. Slots are reused
/// immediately after release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl SlotId {
    /// Raw index into the table
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one accepted connection
///
/// Handed out in increasing order and never reused, so a token always
/// names exactly one endpoint even after its slot has been recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointToken(pub u64);

impl std::fmt::Display for EndpointToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source of fresh endpoint tokens
#[derive(Debug, Default)]
pub struct TokenSource {
    next: u64,
}

impl TokenSource {
    /// Hand out the next unused token
    pub fn next_token(&mut self) -> EndpointToken {
        let token = EndpointToken(self.next);
        self.next += 1;
        token
    }
}
