//! Client Module
//!
//! Connection runtime, correlation of responses to calls, and the call
//! proxy presented to application code.
//!
//! ## Call Path
//! ```text
//! ServiceProxy::invoke
//!   │ build Request, register id
//!   ▼
//! RpcClient ──writer──▶ socket ──▶ server
//!                                    │
//! CorrelationTable ◀──resolve pool◀──reader
//!   │ settle handle
//!   ▼
//! ServiceProxy returns Ok(value) / Err(..)
//! ```

mod connection;
mod correlation;
mod proxy;

pub use connection::RpcClient;
pub use correlation::{CorrelationTable, PendingHandle};
pub use proxy::{ProxyFactory, ServiceProxy};
