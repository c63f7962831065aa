//! Lobby state and the broadcast primitive
//!
//! The lobby owns the session table and the per-session write path. It is
//! driven by [`ChatServer`](crate::ChatServer): admission and teardown live
//! in `connection.rs`, inbound payload handling in `router.rs`.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{error, warn};

use crate::config::ServerConfig;
use crate::error::{FrameError, SendError};
use crate::frame::Frame;
use crate::message;
use crate::table::SessionTable;
use crate::types::{SlotId, TokenSource};

/// Pre-computed frame capacities for the running configuration
#[derive(Debug, Clone, Copy)]
pub(crate) struct Capacities {
    pub line: usize,
    pub list: usize,
    pub chat: usize,
}

impl Capacities {
    fn for_config(config: &ServerConfig) -> Self {
        Self {
            line: message::line_capacity(config.max_name_len),
            list: message::list_capacity(config.capacity, config.max_name_len),
            chat: message::chat_capacity(config.read_limit, config.max_name_len),
        }
    }
}

/// The single chat room
///
/// Exclusively owned by the control loop; every method runs to completion
/// before the loop waits again. `E` is the session endpoint type.
#[derive(Debug)]
pub struct Lobby<E = TcpStream> {
    pub(crate) table: SessionTable<E>,
    pub(crate) tokens: TokenSource,
    pub(crate) config: ServerConfig,
    pub(crate) caps: Capacities,
}

impl<E> Lobby<E> {
    /// Create an empty lobby sized from `config`
    pub fn new(config: ServerConfig) -> Self {
        Self {
            table: SessionTable::new(config.capacity),
            tokens: TokenSource::default(),
            caps: Capacities::for_config(&config),
            config,
        }
    }

    /// The session table
    pub fn table(&self) -> &SessionTable<E> {
        &self.table
    }
}

impl<E: AsyncWrite + Unpin> Lobby<E> {
    /// Write `message` to every active session except `exclude`
    ///
    /// A failed write is logged and delivery continues with the next
    /// session. The failing session stays active; only a failed read or a
    /// hangup tears it down. Returns the number of successful deliveries.
    pub async fn broadcast(&mut self, message: &[u8], exclude: Option<SlotId>) -> usize {
        let limit = self.config.write_timeout;
        let mut delivered = 0;

        for session in self.table.iter_mut() {
            if Some(session.slot) == exclude {
                continue;
            }
            match write_bounded(&mut session.endpoint, message, limit).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Failed to send to '{}' (slot {}): {}",
                    session.name(),
                    session.slot,
                    e
                ),
            }
        }

        delivered
    }

    /// Broadcast a frame, or log why it could not be built
    pub(crate) async fn broadcast_frame(
        &mut self,
        frame: Result<Frame, FrameError>,
        exclude: Option<SlotId>,
    ) {
        match frame {
            Ok(frame) => {
                self.broadcast(frame.as_bytes(), exclude).await;
            }
            Err(e) => error!("Broadcast dropped: {}", e),
        }
    }

    /// Write privately to one session
    pub(crate) async fn send_to(&mut self, slot: SlotId, frame: Result<Frame, FrameError>) {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                error!("Message to slot {} dropped: {}", slot, e);
                return;
            }
        };
        let limit = self.config.write_timeout;
        let Some(session) = self.table.get_mut(slot) else {
            return;
        };
        if let Err(e) = write_bounded(&mut session.endpoint, frame.as_bytes(), limit).await {
            warn!(
                "Failed to send to '{}' (slot {}): {}",
                session.name(),
                session.slot,
                e
            );
        }
    }
}

/// Write all of `bytes`, giving up after `limit`
pub(crate) async fn write_bounded<W: AsyncWrite + Unpin>(
    stream: &mut W,
    bytes: &[u8],
    limit: Duration,
) -> Result<(), SendError> {
    match tokio::time::timeout(limit, stream.write_all(bytes)).await {
        Ok(result) => result.map_err(SendError::from),
        Err(_) => Err(SendError::TimedOut),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, ErrorKind};
    use std::net::SocketAddr;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{duplex, AsyncBufReadExt, BufReader, DuplexStream};

    use super::*;

    /// Endpoint that is either a working in-memory pipe or always fails
    #[derive(Debug)]
    enum TestEndpoint {
        Healthy(DuplexStream),
        Broken,
    }

    impl AsyncWrite for TestEndpoint {
        fn poll_write(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            match self.get_mut() {
                TestEndpoint::Healthy(stream) => Pin::new(stream).poll_write(cx, buf),
                TestEndpoint::Broken => Poll::Ready(Err(io::Error::from(ErrorKind::BrokenPipe))),
            }
        }

        fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            match self.get_mut() {
                TestEndpoint::Healthy(stream) => Pin::new(stream).poll_flush(cx),
                TestEndpoint::Broken => Poll::Ready(Ok(())),
            }
        }

        fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            match self.get_mut() {
                TestEndpoint::Healthy(stream) => Pin::new(stream).poll_shutdown(cx),
                TestEndpoint::Broken => Poll::Ready(Ok(())),
            }
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:6000".parse().unwrap()
    }

    async fn next_line(reader: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        line
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_broadcast() {
        let mut lobby = Lobby::<TestEndpoint>::new(ServerConfig::default());
        let (first, first_peer) = duplex(4096);
        let (last, last_peer) = duplex(4096);

        lobby.admit(TestEndpoint::Healthy(first), peer()).await;
        lobby.admit(TestEndpoint::Broken, peer()).await;
        lobby.admit(TestEndpoint::Healthy(last), peer()).await;

        let delivered = lobby.broadcast(b"hello\n", None).await;

        assert_eq!(delivered, 2);
        assert_eq!(lobby.table().len(), 3);
        assert!(lobby.table().get(SlotId(1)).is_some());

        let mut first_peer = BufReader::new(first_peer);
        assert_eq!(
            next_line(&mut first_peer).await,
            "Welcome to the chat server! Your name is: user0\n"
        );
        assert_eq!(next_line(&mut first_peer).await, "*** user1 has joined the chat ***\n");
        assert_eq!(next_line(&mut first_peer).await, "*** user2 has joined the chat ***\n");
        assert_eq!(next_line(&mut first_peer).await, "hello\n");

        let mut last_peer = BufReader::new(last_peer);
        assert_eq!(
            next_line(&mut last_peer).await,
            "Welcome to the chat server! Your name is: user2\n"
        );
        assert_eq!(next_line(&mut last_peer).await, "hello\n");
    }

    #[tokio::test]
    async fn test_broadcast_skips_excluded_slot() {
        let mut lobby = Lobby::<TestEndpoint>::new(ServerConfig::default());
        let (first, _first_peer) = duplex(4096);
        let (second, _second_peer) = duplex(4096);
        lobby.admit(TestEndpoint::Healthy(first), peer()).await;
        lobby.admit(TestEndpoint::Healthy(second), peer()).await;

        assert_eq!(lobby.broadcast(b"x\n", Some(SlotId(0))).await, 1);
        assert_eq!(lobby.broadcast(b"x\n", None).await, 2);
    }
}
