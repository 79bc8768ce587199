//! # netrpc
//!
//! A binary RPC transport over TCP with:
//! - Fixed 30-byte frame header with CRC-32C integrity check
//! - Multiplexed concurrent calls over one connection, correlated by id
//! - Heartbeats on client write-idle, disconnect on server read-idle
//! - Dual client/server timeout policy with status-coded responses
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────┐                ┌──────────────────────────┐
//! │       ServiceProxy       │                │      ServiceRegistry     │
//! │   (typed client stubs)   │                │  (interface → service)   │
//! └────────────┬─────────────┘                └────────────▲─────────────┘
//!              │                                           │
//! ┌────────────▼─────────────┐                ┌────────────┴─────────────┐
//! │        RpcClient         │                │        Dispatcher        │
//! │  CorrelationTable, I/O   │                │  timeout policy, pools   │
//! └────────────┬─────────────┘                └────────────▲─────────────┘
//!              │                                           │
//! ┌────────────▼─────────────┐     TCP        ┌────────────┴─────────────┐
//! │   codec + FrameBuffer    │ ─────────────▶ │   FrameBuffer + codec    │
//! └──────────────────────────┘ ◀───────────── └──────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod serialize;
pub mod pool;
pub mod client;
pub mod server;
pub mod service;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RpcError, Result};
pub use config::{ClientConfig, ReferenceConfig, ServerConfig};
pub use client::{ProxyFactory, RpcClient, ServiceProxy};
pub use server::{Server, ServiceRegistry};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of netrpc
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
