//! Error types for the chat server
//!
//! Defines setup errors, per-session send errors and message assembly errors.
//! Uses thiserror for ergonomic error definitions.

use std::net::SocketAddr;

use thiserror::Error;

/// Application-level errors
///
/// Everything here is fatal at startup: the process exits with a failure
/// status before the control loop begins.
#[derive(Debug, Error)]
pub enum AppError {
    /// Could not create, bind or listen on the listening endpoint
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Configuration value could not be used
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Message send errors
///
/// A failed write to one session. Logged by the caller, never fatal.
#[derive(Debug, Error)]
pub enum SendError {
    /// The socket write itself failed
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The peer did not accept the bytes in time
    #[error("write timed out")]
    TimedOut,
}

/// Outbound message assembly errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Appending would exceed the fixed message capacity
    #[error("message overflow: needs {needed} bytes, capacity is {capacity}")]
    Overflow { capacity: usize, needed: usize },
}
