//! Readiness multiplexing
//!
//! Builds the watched set from the listening endpoint and every active
//! session, blocks until one of them is actionable, then takes a snapshot of
//! everything that is ready at that moment.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;

use futures_util::future::{self, select_all};
use futures_util::FutureExt;
use tokio::io::{Interest, Ready};
use tokio::net::{TcpListener, TcpStream};
use tracing::warn;

use crate::session::Session;
use crate::table::SessionTable;
use crate::types::EndpointToken;

/// What a session endpoint is watched for
const SESSION_INTEREST: Interest = Interest::READABLE.add(Interest::ERROR);

/// Readiness of one session endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReadiness {
    pub token: EndpointToken,
    /// Data (or end-of-stream) can be read
    pub readable: bool,
    /// The peer hung up or the socket reported an error
    pub hangup: bool,
}

impl SessionReadiness {
    fn from_ready(token: EndpointToken, ready: Ready) -> Self {
        Self {
            token,
            readable: ready.is_readable(),
            hangup: ready.is_read_closed() || ready.is_error(),
        }
    }
}

/// Outcome of one wait
#[derive(Debug)]
pub enum Wake {
    /// At least one endpoint is actionable
    Ready {
        /// Result of accepting on the listening endpoint, if it was ready
        accepted: Option<io::Result<(TcpStream, SocketAddr)>>,
        /// Ready sessions, in slot order
        sessions: Vec<SessionReadiness>,
    },
    /// The shutdown future completed
    Shutdown,
}

/// Block until the listener, a session or `shutdown` is ready
pub async fn wait_for_readiness<F>(
    listener: &TcpListener,
    table: &SessionTable<TcpStream>,
    shutdown: Pin<&mut F>,
) -> Wake
where
    F: Future<Output = ()>,
{
    let watched: Vec<_> = table.iter().map(|s| Box::pin(watch(s))).collect();
    let any_session = async move {
        if watched.is_empty() {
            future::pending::<()>().await;
        } else {
            select_all(watched).await;
        }
    };

    let accepted = tokio::select! {
        biased;
        _ = shutdown => return Wake::Shutdown,
        accepted = listener.accept() => Some(accepted),
        _ = any_session => None,
    };

    // A session woke us; the listener may be ready too
    let accepted = accepted.or_else(|| listener.accept().now_or_never());

    Wake::Ready {
        accepted,
        sessions: snapshot(table),
    }
}

async fn watch(session: &Session<TcpStream>) -> io::Result<Ready> {
    session.endpoint.ready(SESSION_INTEREST).await
}

/// Readiness of every session that is actionable right now
fn snapshot(table: &SessionTable<TcpStream>) -> Vec<SessionReadiness> {
    table
        .iter()
        .filter_map(|session| match watch(session).now_or_never()? {
            Ok(ready) => Some(SessionReadiness::from_ready(session.token, ready)),
            Err(e) => {
                warn!("Readiness query for slot {} failed: {}", session.slot, e);
                None
            }
        })
        .collect()
}
