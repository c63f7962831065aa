//! ChatServer control loop
//!
//! One task owns the listening endpoint and the lobby. Each cycle collects
//! the watched endpoints, waits until something is ready, then dispatches:
//! listener first, then sessions in slot order. No other task touches the
//! state, so no locks or channels are needed.

use std::future::Future;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::lobby::Lobby;
use crate::readiness::{wait_for_readiness, SessionReadiness, Wake};

/// Why the control loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The listening endpoint reported an unrecoverable error
    ListenerFailed,
    /// The shutdown future passed to [`ChatServer::run`] completed
    Requested,
}

/// The chat server: listening endpoint plus lobby
pub struct ChatServer {
    listener: TcpListener,
    lobby: Lobby<TcpStream>,
}

impl ChatServer {
    /// Create the listening endpoint
    ///
    /// Fails if the configuration is unusable or the address cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<Self, AppError> {
        config.validate()?;
        let addr = config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AppError::Bind { addr, source })?;

        Ok(Self {
            listener,
            lobby: Lobby::new(config),
        })
    }

    /// Address the listener is actually bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the control loop until the listener fails or `shutdown` completes
    ///
    /// On exit every session is closed, then the listener.
    pub async fn run<F>(mut self, shutdown: F) -> ShutdownReason
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if let Ok(addr) = self.local_addr() {
            info!("Chat server listening on {}", addr);
        }
        info!("Commands: /name <newname>, /list");

        let reason = loop {
            let wake =
                wait_for_readiness(&self.listener, self.lobby.table(), shutdown.as_mut()).await;
            match wake {
                Wake::Shutdown => break ShutdownReason::Requested,
                Wake::Ready { accepted, sessions } => {
                    if let Some(reason) = self.dispatch(accepted, sessions).await {
                        break reason;
                    }
                }
            }
        };

        self.close(reason)
    }

    /// Close every session, then the listener
    fn close(mut self, reason: ShutdownReason) -> ShutdownReason {
        info!("Shutting down ({:?})", reason);
        let closed = self.lobby.close_all();
        info!("Closed {} session(s)", closed);
        drop(self.listener);

        reason
    }

    /// Act on one readiness snapshot
    async fn dispatch(
        &mut self,
        accepted: Option<io::Result<(TcpStream, SocketAddr)>>,
        sessions: Vec<SessionReadiness>,
    ) -> Option<ShutdownReason> {
        match accepted {
            Some(Ok((stream, peer))) => {
                self.lobby.admit(stream, peer).await;
            }
            Some(Err(e)) if is_listener_fatal(&e) => {
                error!("Listening endpoint failed: {}", e);
                return Some(ShutdownReason::ListenerFailed);
            }
            Some(Err(e)) => warn!("Failed to accept connection: {}", e),
            None => {}
        }

        for event in sessions {
            if event.readable {
                if let Some(slot) = self.lobby.table().find_by_endpoint(event.token) {
                    self.lobby.on_readable(slot).await;
                }
            }
            // The read above may already have torn the session down
            if event.hangup {
                if let Some(slot) = self.lobby.table().find_by_endpoint(event.token) {
                    self.lobby.teardown(slot).await;
                }
            }
        }

        None
    }
}

/// Accept errors that mean the listening socket itself is unusable
///
/// Everything else is a failure of the one pending connection.
fn is_listener_fatal(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::InvalidInput | ErrorKind::NotConnected | ErrorKind::BrokenPipe | ErrorKind::Unsupported
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::time::timeout;

    use super::*;
    use crate::types::SlotId;

    async fn loopback_server() -> ChatServer {
        ChatServer::bind(ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        })
        .await
        .unwrap()
    }

    /// Connect a client and admit it directly into the lobby
    async fn connect(server: &mut ChatServer) -> BufReader<TcpStream> {
        let client = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();
        let (stream, peer) = server.listener.accept().await.unwrap();
        server.lobby.admit(stream, peer).await.unwrap();
        BufReader::new(client)
    }

    /// Next line, or an empty string once the peer has closed
    async fn next_line(client: &mut BufReader<TcpStream>) -> String {
        let mut line = String::new();
        timeout(Duration::from_secs(5), client.read_line(&mut line))
            .await
            .unwrap()
            .unwrap_or(0);
        line
    }

    #[test]
    fn test_listener_fatal_classification() {
        assert!(is_listener_fatal(&io::Error::from(ErrorKind::InvalidInput)));
        assert!(!is_listener_fatal(&io::Error::from(ErrorKind::ConnectionAborted)));
        assert!(!is_listener_fatal(&io::Error::from(ErrorKind::ConnectionReset)));
    }

    #[tokio::test]
    async fn test_bind_failure_reported() {
        let first = ChatServer::bind(ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        })
        .await
        .unwrap();
        let taken = first.local_addr().unwrap();

        let second = ChatServer::bind(ServerConfig {
            bind_addr: taken,
            ..ServerConfig::default()
        })
        .await;

        assert!(matches!(second, Err(AppError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_run_returns_on_shutdown() {
        let server = ChatServer::bind(ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        })
        .await
        .unwrap();

        let reason = server.run(async {}).await;

        assert_eq!(reason, ShutdownReason::Requested);
    }

    #[tokio::test]
    async fn test_fatal_accept_error_shuts_down() {
        let mut server = loopback_server().await;
        let mut client = connect(&mut server).await;
        assert_eq!(
            next_line(&mut client).await,
            "Welcome to the chat server! Your name is: user0\n"
        );

        let reason = server
            .dispatch(Some(Err(io::Error::from(ErrorKind::InvalidInput))), vec![])
            .await;

        assert_eq!(reason, Some(ShutdownReason::ListenerFailed));
        assert_eq!(server.lobby.table().len(), 1);

        assert_eq!(server.close(ShutdownReason::ListenerFailed), ShutdownReason::ListenerFailed);
        assert_eq!(next_line(&mut client).await, "");
    }

    #[tokio::test]
    async fn test_transient_accept_error_keeps_running() {
        let mut server = loopback_server().await;

        let reason = server
            .dispatch(Some(Err(io::Error::from(ErrorKind::ConnectionAborted))), vec![])
            .await;

        assert_eq!(reason, None);
    }

    #[tokio::test]
    async fn test_hangup_without_read_tears_down_once() {
        let mut server = loopback_server().await;
        let mut stays = connect(&mut server).await;
        let mut leaves = connect(&mut server).await;
        next_line(&mut stays).await;
        assert_eq!(next_line(&mut stays).await, "*** user1 has joined the chat ***\n");
        next_line(&mut leaves).await;

        let token = server.lobby.table().get(SlotId(1)).unwrap().token;
        let hangup = SessionReadiness {
            token,
            readable: false,
            hangup: true,
        };

        assert_eq!(server.dispatch(None, vec![hangup]).await, None);

        assert!(server.lobby.table().get(SlotId(1)).is_none());
        assert_eq!(server.lobby.table().len(), 1);
        assert_eq!(next_line(&mut stays).await, "*** user1 has left the chat ***\n");
        assert_eq!(next_line(&mut leaves).await, "");

        // A stale event for the same endpoint is ignored
        assert_eq!(server.dispatch(None, vec![hangup]).await, None);
        let mut line = String::new();
        let quiet = timeout(Duration::from_millis(200), stays.read_line(&mut line)).await;
        assert!(quiet.is_err(), "unexpected data: {:?}", line);
    }
}
