//! Single-Room Broadcast Chat Server Library
//!
//! A line-based TCP chat server. Every connected client is in the same
//! room; text lines are relayed to everyone else, and two commands operate
//! alongside chat.
//!
//! # Features
//! - Bounded number of concurrent sessions; extra connections are told the
//!   server is full and closed
//! - Default names (`user0`, `user1`, ...) and `/name <newname>` to rename
//! - `/list` for a private listing of everyone connected
//! - Join, leave and rename announcements
//!
//! # Architecture
//! A single task runs the whole server:
//! - `ChatServer` owns the listening endpoint and the `Lobby`
//! - Each cycle waits on the listener and every session at once, then
//!   dispatches the ready ones in a fixed order
//! - No locks and no channels; one handler finishes before the next starts
//!
//! # Example
//! ```ignore
//! use lobby_chat::{ChatServer, ServerConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let server = ChatServer::bind(ServerConfig::default()).await.unwrap();
//!     server.run(async { tokio::signal::ctrl_c().await.unwrap() }).await;
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod lobby;
pub mod message;
pub mod readiness;
pub mod router;
pub mod server;
pub mod session;
pub mod table;
pub mod types;

// Re-export main types for convenience
pub use config::ServerConfig;
pub use error::{AppError, FrameError, SendError};
pub use frame::Frame;
pub use lobby::Lobby;
pub use message::Inbound;
pub use server::{ChatServer, ShutdownReason};
pub use session::Session;
pub use table::SessionTable;
pub use types::{EndpointToken, SlotId};
