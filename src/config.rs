//! Configuration for Roster
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, RosterError};

/// Largest datagram the receive buffer needs to hold
pub const MAX_DATAGRAM_SIZE: usize = 65535;

/// Largest payload an IPv4 UDP datagram can carry (65535 minus IP and UDP headers)
pub const MAX_UDP_PAYLOAD: usize = 65507;

/// Main configuration for a Roster server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory for the durable store. `None` keeps everything in memory.
    /// Internal structure:
    ///   {data_dir}/
    ///     └── roster.wal       (write-ahead log)
    pub data_dir: Option<PathBuf>,

    /// Sync strategy: how often to fsync the WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub tcp_listen_addr: String,

    /// UDP listen address
    pub udp_listen_addr: String,

    /// Max concurrent TCP sessions (`None` = unbounded)
    pub max_connections: Option<usize>,

    /// Connection read timeout (milliseconds, 0 = block indefinitely)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = block indefinitely)
    pub write_timeout_ms: u64,

    /// Receive buffer and reply cap for datagrams (bytes); replies never
    /// exceed `MAX_UDP_PAYLOAD`
    pub datagram_buffer_size: usize,

    /// How often blocked accept/receive loops look at the shutdown flag
    pub shutdown_poll_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            tcp_listen_addr: "0.0.0.0:5000".to_string(),
            udp_listen_addr: "0.0.0.0:5001".to_string(),
            max_connections: None,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            datagram_buffer_size: MAX_DATAGRAM_SIZE,
            shutdown_poll_ms: 100,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the values that would otherwise fail deep inside a listener
    pub fn validate(&self) -> Result<()> {
        if self.datagram_buffer_size == 0 || self.datagram_buffer_size > MAX_DATAGRAM_SIZE {
            return Err(RosterError::Config(format!(
                "datagram_buffer_size must be between 1 and {}, got {}",
                MAX_DATAGRAM_SIZE, self.datagram_buffer_size
            )));
        }
        if self.shutdown_poll_ms == 0 {
            return Err(RosterError::Config(
                "shutdown_poll_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_connections == Some(0) {
            return Err(RosterError::Config(
                "max_connections must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Poll interval as a `Duration`
    pub fn shutdown_poll_interval(&self) -> Duration {
        Duration::from_millis(self.shutdown_poll_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Persist data under this directory (enables the journaled store)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(path.into());
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the TCP listen address
    pub fn tcp_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.tcp_listen_addr = addr.into();
        self
    }

    /// Set the UDP listen address
    pub fn udp_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.udp_listen_addr = addr.into();
        self
    }

    /// Cap the number of concurrent TCP sessions
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = Some(count);
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the datagram buffer size (in bytes)
    pub fn datagram_buffer_size(mut self, size: usize) -> Self {
        self.config.datagram_buffer_size = size;
        self
    }

    /// Set the shutdown poll interval (in milliseconds)
    pub fn shutdown_poll_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_poll_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
