//! Error types for netrpc
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::protocol::Status;

/// Result type alias using RpcError
pub type Result<T> = std::result::Result<T, RpcError>;

/// Unified error type for netrpc operations
#[derive(Debug, Error)]
pub enum RpcError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Frame Integrity Errors (connection-fatal)
    // -------------------------------------------------------------------------
    #[error("Bad magic number: 0x{0:04x}")]
    BadMagic(u16),

    #[error("Incorrect crc32c checksum: stored 0x{stored:08x}, computed 0x{computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("Frame too large: {length} bytes (max {max})")]
    FrameTooLarge { length: usize, max: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Value conversion error: {0}")]
    Conversion(String),

    // -------------------------------------------------------------------------
    // Call Outcome Errors
    // -------------------------------------------------------------------------
    /// The server answered with a non-OK status.
    #[error("Remote call failed ({status:?}): {message}")]
    Remote {
        status: Status,
        message: String,
        cause: Option<String>,
    },

    /// The local wait for a response expired.
    #[error("Call {id} timed out after {timeout_ms} ms")]
    Timeout { id: String, timeout_ms: u64 },

    #[error("Channel inactive: {0}")]
    ChannelInactive(String),

    #[error("Disconnected: {0}")]
    Disconnected(String),

    // -------------------------------------------------------------------------
    // Runtime Errors
    // -------------------------------------------------------------------------
    #[error("Duplicate correlation id: {0}")]
    DuplicateId(String),

    #[error("Worker pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),

    #[error("Registry error: {0}")]
    Registry(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RpcError {
    /// Whether this error means the frame (and so the connection) can no
    /// longer be trusted.
    pub fn is_frame_fatal(&self) -> bool {
        matches!(
            self,
            RpcError::BadMagic(_)
                | RpcError::ChecksumMismatch { .. }
                | RpcError::FrameTooLarge { .. }
                | RpcError::Protocol(_)
                | RpcError::Serialization(_)
        )
    }
}

impl From<bincode::Error> for RpcError {
    fn from(e: bincode::Error) -> Self {
        RpcError::Serialization(e.to_string())
    }
}
