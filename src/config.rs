//! Configuration for netrpc
//!
//! Client and server configuration with sensible defaults.
//!
//! Server read-idle should be a multiple (2-3x) of the client's write-idle
//! interval so a healthy but quiet client is never mistaken for a dead one.
//! The defaults (2000 ms / 5000 ms) keep that ratio.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Result, RpcError};
use crate::protocol::{DEFAULT_MAX_FRAME_LENGTH, HEADER_LENGTH};
use crate::serialize::Serialization;

/// Default server port
pub const DEFAULT_PORT: u16 = 20820;

/// Lowest port accepted for a client target
pub const MIN_PORT: u16 = 1025;

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for one client connection
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Target
    // -------------------------------------------------------------------------
    /// Server host name or address
    pub host: String,

    /// Server port
    pub port: u16,

    /// TCP connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Calls
    // -------------------------------------------------------------------------
    /// Per-call timeout (milliseconds), 0 = wait indefinitely
    pub timeout_ms: u64,

    /// Payload codec for outgoing requests
    pub serialization: Serialization,

    /// Largest frame accepted from the server (header + body)
    pub max_frame_length: usize,

    // -------------------------------------------------------------------------
    // Runtime
    // -------------------------------------------------------------------------
    /// Idle time on the write side before a heartbeat is sent (milliseconds)
    pub write_idle_ms: u64,

    /// Threads resolving responses off the I/O thread
    pub worker_threads: usize,

    /// Grace period for shutting the runtime down (milliseconds)
    pub shutdown_timeout_ms: u64,
}

/// Per-interface client configuration handed to the stub factory
pub type ReferenceConfig = ClientConfig;

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 3000,
            timeout_ms: 0,
            serialization: Serialization::default(),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            write_idle_ms: 2000,
            worker_threads: 16,
            shutdown_timeout_ms: 3000,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// `host:port` as written in the config
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve the target to a socket address
    pub fn resolve(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| RpcError::Config(format!("Cannot resolve {}: {}", self.address(), e)))?
            .next()
            .ok_or_else(|| RpcError::Config(format!("No address for {}", self.address())))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_idle(&self) -> Duration {
        Duration::from_millis(self.write_idle_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Check the configuration before it is used
    pub fn validate(&self) -> Result<()> {
        if self.port < MIN_PORT {
            return Err(RpcError::Config(format!(
                "Port {} out of range [{}, 65535]",
                self.port, MIN_PORT
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(RpcError::Config("connect_timeout_ms must be > 0".into()));
        }
        if self.write_idle_ms == 0 {
            return Err(RpcError::Config("write_idle_ms must be > 0".into()));
        }
        if self.timeout_ms > i32::MAX as u64 {
            return Err(RpcError::Config(format!(
                "timeout_ms {} does not fit the wire field",
                self.timeout_ms
            )));
        }
        if self.max_frame_length < HEADER_LENGTH {
            return Err(RpcError::Config(format!(
                "max_frame_length must be at least {}",
                HEADER_LENGTH
            )));
        }
        if self.worker_threads == 0 {
            return Err(RpcError::Config("worker_threads must be > 0".into()));
        }
        self.resolve()?;
        Ok(())
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set host and port from a socket address
    pub fn address(mut self, addr: SocketAddr) -> Self {
        self.config.host = addr.ip().to_string();
        self.config.port = addr.port();
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the per-call timeout (0 = unlimited)
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn serialization(mut self, serialization: Serialization) -> Self {
        self.config.serialization = serialization;
        self
    }

    pub fn max_frame_length(mut self, length: usize) -> Self {
        self.config.max_frame_length = length;
        self
    }

    /// Set the heartbeat interval (milliseconds)
    pub fn write_idle_ms(mut self, ms: u64) -> Self {
        self.config.write_idle_ms = ms;
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = threads;
        self
    }

    pub fn shutdown_timeout_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_timeout_ms = ms;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for a server instance
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // -------------------------------------------------------------------------
    // Network
    // -------------------------------------------------------------------------
    /// TCP listen address (port 0 = ephemeral)
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Idle time on the read side before the peer is presumed dead
    /// (milliseconds)
    pub read_idle_ms: u64,

    /// Largest frame accepted from a client (header + body)
    pub max_frame_length: usize,

    /// Longest a single response write may block before the connection is
    /// dropped (milliseconds)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------
    /// Server-side call timeout (milliseconds), 0 = no server limit
    pub timeout_ms: u64,

    /// Threads per worker pool (dispatch and invoke)
    pub worker_threads: usize,

    /// Queued jobs per pool before requests are rejected
    pub worker_queue_capacity: usize,

    /// Grace period for draining worker pools on shutdown (milliseconds)
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            max_connections: 1024,
            read_idle_ms: 5000,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            write_timeout_ms: 3000,
            timeout_ms: 5000,
            worker_threads: 16,
            worker_queue_capacity: 1024,
            shutdown_timeout_ms: 3000,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    pub fn read_idle(&self) -> Duration {
        Duration::from_millis(self.read_idle_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Check the configuration before it is used
    pub fn validate(&self) -> Result<()> {
        let addr = self
            .listen_addr
            .to_socket_addrs()
            .map_err(|e| RpcError::Config(format!("Cannot resolve {}: {}", self.listen_addr, e)))?
            .next()
            .ok_or_else(|| RpcError::Config(format!("No address for {}", self.listen_addr)))?;
        if addr.port() != 0 && addr.port() < MIN_PORT {
            return Err(RpcError::Config(format!(
                "Port {} out of range [{}, 65535]",
                addr.port(),
                MIN_PORT
            )));
        }
        if self.read_idle_ms == 0 {
            return Err(RpcError::Config("read_idle_ms must be > 0".into()));
        }
        if self.write_timeout_ms == 0 {
            return Err(RpcError::Config("write_timeout_ms must be > 0".into()));
        }
        if self.max_frame_length < HEADER_LENGTH {
            return Err(RpcError::Config(format!(
                "max_frame_length must be at least {}",
                HEADER_LENGTH
            )));
        }
        if self.max_connections == 0 {
            return Err(RpcError::Config("max_connections must be > 0".into()));
        }
        if self.worker_threads == 0 || self.worker_queue_capacity == 0 {
            return Err(RpcError::Config(
                "worker pools need at least one thread and one queue slot".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
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

    /// Set the read-idle interval (milliseconds)
    pub fn read_idle_ms(mut self, ms: u64) -> Self {
        self.config.read_idle_ms = ms;
        self
    }

    pub fn max_frame_length(mut self, length: usize) -> Self {
        self.config.max_frame_length = length;
        self
    }

    /// Set the per-write timeout for responses (milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the server-side call timeout (milliseconds)
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = threads;
        self
    }

    pub fn worker_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.worker_queue_capacity = capacity;
        self
    }

    pub fn shutdown_timeout_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_timeout_ms = ms;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
