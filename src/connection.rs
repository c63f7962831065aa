//! Connection lifecycle
//!
//! Admission of accepted connections and teardown of departing sessions.

use std::net::SocketAddr;

use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use crate::lobby::{write_bounded, Lobby};
use crate::message;
use crate::session::Session;
use crate::types::SlotId;

impl<E: AsyncWrite + Unpin> Lobby<E> {
    /// Admit one accepted connection
    ///
    /// When every slot is taken the connection is told so and closed; it
    /// never enters the session table. Otherwise it gets a slot, a default
    /// name and a private welcome, and everyone else hears that it joined.
    pub async fn admit(&mut self, mut stream: E, peer: SocketAddr) -> Option<SlotId> {
        let Some(slot) = self.table.allocate() else {
            info!("Server full, rejecting connection from {}", peer);
            let limit = self.config.write_timeout;
            if let Err(e) = write_bounded(&mut stream, message::SERVER_FULL, limit).await {
                warn!("Failed to notify {} of full server: {}", peer, e);
            }
            return None;
        };

        let token = self.tokens.next_token();
        let session = Session::new(slot, token, stream, peer);
        let name = session.name().to_string();
        if self.table.insert(session).is_err() {
            // allocate() just reported this slot free
            warn!("Slot {} unexpectedly taken, dropping {}", slot, peer);
            return None;
        }

        info!(
            "Client '{}' connected from {} (slot {}, endpoint {})",
            name, peer, slot, token
        );
        debug!("Active sessions: {}/{}", self.table.len(), self.table.capacity());
        if self.table.is_full() {
            info!("All {} slots taken", self.table.capacity());
        }

        self.send_to(slot, message::welcome(&name, self.caps.line)).await;
        self.broadcast_frame(message::joined(&name, self.caps.line), Some(slot))
            .await;

        Some(slot)
    }

    /// Tear down the session in `slot` and announce its departure
    ///
    /// Releases the slot, closes the endpoint and tells every remaining
    /// session. Returns false if the slot was already inactive, in which
    /// case nothing is announced.
    pub async fn teardown(&mut self, slot: SlotId) -> bool {
        let Some(session) = self.table.release(slot) else {
            return false;
        };

        info!(
            "Client '{}' disconnected (slot {}, peer {})",
            session.name(),
            slot,
            session.peer
        );
        let farewell = message::left(session.name(), self.caps.line);
        drop(session);

        self.broadcast_frame(farewell, None).await;
        debug!("Active sessions: {}/{}", self.table.len(), self.table.capacity());
        true
    }

    /// Close every active session without announcements
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        for session in self.table.drain() {
            debug!("Closing '{}' (slot {})", session.name(), session.slot);
            closed += 1;
        }
        closed
    }
}
