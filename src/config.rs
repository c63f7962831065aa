//! Server configuration
//!
//! Fixed at startup: defaults, then the bind address from the command line,
//! then a couple of environment overrides. Nothing is reconfigured at runtime.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AppError;
use crate::session::default_name;
use crate::types::SlotId;

/// Default bind address (all interfaces)
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Maximum concurrent sessions
pub const DEFAULT_CAPACITY: usize = 14;

/// Size of the per-message receive buffer
pub const BUF_SIZE: usize = 512;

/// Maximum display name length in bytes
pub const MAX_NAME_LEN: usize = 31;

/// Upper bound on a single write to one peer
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

const ENV_MAX_CLIENTS: &str = "CHAT_MAX_CLIENTS";
const ENV_WRITE_TIMEOUT_MS: &str = "CHAT_WRITE_TIMEOUT_MS";

/// Startup configuration for [`ChatServer`](crate::ChatServer)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the listening endpoint
    pub bind_addr: SocketAddr,
    /// Maximum number of active sessions
    pub capacity: usize,
    /// Bytes read from a session per readiness event
    pub read_limit: usize,
    /// Display names are cut to this many bytes
    pub max_name_len: usize,
    /// Bound on each write to a session
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            capacity: DEFAULT_CAPACITY,
            read_limit: BUF_SIZE - 1,
            max_name_len: MAX_NAME_LEN,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Build the configuration from process arguments and environment
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_sources(
            std::env::args().nth(1),
            std::env::var(ENV_MAX_CLIENTS).ok(),
            std::env::var(ENV_WRITE_TIMEOUT_MS).ok(),
        )
    }

    fn from_sources(
        addr: Option<String>,
        max_clients: Option<String>,
        write_timeout_ms: Option<String>,
    ) -> Result<Self, AppError> {
        let mut config = Self::default();

        let addr = addr.unwrap_or_else(|| DEFAULT_ADDR.to_string());
        config.bind_addr = addr
            .parse()
            .map_err(|_| AppError::InvalidConfig(format!("bad bind address '{}'", addr)))?;

        if let Some(raw) = max_clients {
            config.capacity = raw
                .parse()
                .map_err(|_| AppError::InvalidConfig(format!("{ENV_MAX_CLIENTS}='{raw}'")))?;
        }

        if let Some(raw) = write_timeout_ms {
            let ms: u64 = raw
                .parse()
                .map_err(|_| AppError::InvalidConfig(format!("{ENV_WRITE_TIMEOUT_MS}='{raw}'")))?;
            config.write_timeout = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.capacity == 0 {
            return Err(AppError::InvalidConfig("capacity must be at least 1".into()));
        }
        if self.read_limit == 0 {
            return Err(AppError::InvalidConfig("read limit must be at least 1".into()));
        }
        let longest_default = default_name(SlotId(self.capacity - 1));
        if self.max_name_len < longest_default.len() {
            return Err(AppError::InvalidConfig(format!(
                "name length {} cannot hold default name '{}'",
                self.max_name_len, longest_default
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_sources(None, None, None).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_ADDR);
        assert_eq!(config.capacity, 14);
        assert_eq!(config.read_limit, 511);
        assert_eq!(config.max_name_len, 31);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_sources(
            Some("127.0.0.1:9000".to_string()),
            Some("3".to_string()),
            Some("250".to_string()),
        )
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.capacity, 3);
        assert_eq!(config.write_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_bad_address_rejected() {
        let err = ServerConfig::from_sources(Some("nowhere".to_string()), None, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ServerConfig::from_sources(None, Some("0".to_string()), None).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig(_)));
    }

    #[test]
    fn test_name_length_must_fit_defaults() {
        let config = ServerConfig {
            capacity: 100,
            max_name_len: 5,
            ..ServerConfig::default()
        };
        // "user99" is six bytes
        assert!(config.validate().is_err());
    }
}
