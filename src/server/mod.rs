//! Server Module
//!
//! TCP server, per-connection pipeline and request dispatch.
//!
//! ## Architecture
//! - Single acceptor thread, one thread per connection
//! - Dispatch pool waits on each request under the timeout policy
//! - Invoke pool runs the business method
//! - Requests routed through the ServiceRegistry

mod connection;
mod dispatch;
mod registry;
mod server;

pub use connection::{Connection, ResponseWriter};
pub use dispatch::{error_response, Dispatcher, TimeoutPolicy};
pub use registry::{InvokeError, MethodTable, Service, ServiceError, ServiceRegistry};
pub use server::Server;
