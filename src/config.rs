//! Configuration for cmdlog
//!
//! Centralized configuration with sensible defaults.

use crate::error::{LogError, Result};

/// Default number of commands retained by the log
pub const DEFAULT_CAPACITY: usize = 10;

/// Default command terminator
pub const DEFAULT_TERMINATOR: u8 = b'\n';

/// Main configuration for an engine (and the server wrapped around it)
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// Number of completed commands retained before the oldest is evicted.
    /// Fixed for the lifetime of the engine.
    pub capacity: usize,

    /// Byte that ends a command
    pub terminator: u8,

    /// Slice length for interruptible lock waits (milliseconds).
    /// A blocked caller notices cancellation within roughly this long.
    pub lock_poll_ms: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds). Idle connections wake up this
    /// often to check for shutdown.
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,

    /// Size of the per-connection receive buffer; each `recv` feeds at most
    /// this many bytes into the engine
    pub recv_buffer_size: usize,

    /// Interval between timestamp commands (milliseconds), `None` disables
    /// the ticker
    pub timestamp_interval_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            terminator: DEFAULT_TERMINATOR,
            lock_poll_ms: 10,
            listen_addr: "0.0.0.0:9000".to_string(),
            max_connections: 5,
            read_timeout_ms: 1000,
            write_timeout_ms: 5000,
            recv_buffer_size: 1024,
            timestamp_interval_ms: Some(10_000),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(LogError::Config("capacity must be at least 1".to_string()));
        }
        if self.lock_poll_ms == 0 {
            return Err(LogError::Config("lock_poll_ms must be at least 1".to_string()));
        }
        if self.recv_buffer_size == 0 {
            return Err(LogError::Config(
                "recv_buffer_size must be at least 1".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(LogError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.timestamp_interval_ms == Some(0) {
            return Err(LogError::Config(
                "timestamp interval must be non-zero (use None to disable)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the number of retained commands
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Set the command terminator byte
    pub fn terminator(mut self, terminator: u8) -> Self {
        self.config.terminator = terminator;
        self
    }

    /// Set the interruptible lock poll slice (in milliseconds)
    pub fn lock_poll_ms(mut self, ms: u64) -> Self {
        self.config.lock_poll_ms = ms;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
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

    /// Set the per-connection receive buffer size
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    /// Set the timestamp interval (in milliseconds), `None` disables it
    pub fn timestamp_interval_ms(mut self, ms: Option<u64>) -> Self {
        self.config.timestamp_interval_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
