//! Message router
//!
//! Reads one payload from a readable session and acts on it: rename, list,
//! or relay as chat. A failed or empty read tears the session down.

use std::io::ErrorKind;

use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::lobby::Lobby;
use crate::message::{self, Inbound};
use crate::types::SlotId;

impl Lobby<TcpStream> {
    /// Handle readability of the session in `slot`
    pub async fn on_readable(&mut self, slot: SlotId) {
        let mut buf = vec![0u8; self.config.read_limit];
        let Some(session) = self.table.get(slot) else {
            return;
        };

        let n = match session.endpoint.try_read(&mut buf) {
            Ok(0) => {
                self.teardown(slot).await;
                return;
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                debug!("Spurious readiness on slot {}", slot);
                return;
            }
            Err(e) => {
                warn!("Read from slot {} failed: {}", slot, e);
                self.teardown(slot).await;
                return;
            }
        };

        match Inbound::classify(&buf[..n], self.config.max_name_len) {
            Inbound::Rename(name) => self.handle_rename(slot, name).await,
            Inbound::List => self.handle_list(slot).await,
            Inbound::Chat(text) => self.handle_chat(slot, text).await,
        }
    }

    /// Rename and tell everyone, the renamed session included
    async fn handle_rename(&mut self, slot: SlotId, name: String) {
        let Some(session) = self.table.get_mut(slot) else {
            return;
        };
        let old = session.rename(name);
        let new = session.name().to_string();
        info!("Client '{}' is now known as '{}' (slot {})", old, new, slot);

        self.broadcast_frame(message::renamed(&old, &new, self.caps.line), None)
            .await;
    }

    /// Private participant listing for the requester
    async fn handle_list(&mut self, slot: SlotId) {
        let entries = self.table.iter().map(|s| (s.name(), s.slot == slot));
        let listing = message::participant_list(entries, self.caps.list);
        self.send_to(slot, listing).await;
    }

    /// Relay chat text to everyone but the sender
    async fn handle_chat(&mut self, slot: SlotId, text: &[u8]) {
        let Some(session) = self.table.get(slot) else {
            return;
        };
        let line = message::chat_line(session.name(), text, self.caps.chat);
        if let Ok(frame) = &line {
            info!("{}", message::console_text(frame.as_bytes()).trim_end());
        }
        self.broadcast_frame(line, Some(slot)).await;
    }
}
