//! Call proxy
//!
//! Turns a method call into a request, waits for the response and maps
//! the wire status back into `Ok(value)` or an error.
//!
//! Callers see three kinds of outcome:
//! - `Ok(value)`: the business result
//! - `RpcError::Remote`: the server reported a failure (message + cause)
//! - `RpcError::Timeout` / `ChannelInactive` / `Disconnected`: local
//!   timeout or connectivity problem

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::ReferenceConfig;
use crate::error::{Result, RpcError};
use crate::protocol::{
    FromValue, MethodSignature, Outcome, Request, RequestBody, RequestHeader, Value,
};
use crate::serialize::Serialization;

use super::RpcClient;

/// Client-side stub for one service interface
#[derive(Clone)]
pub struct ServiceProxy {
    client: Arc<RpcClient>,
    interface: String,
    timeout_ms: u64,
    serialization: Serialization,
}

impl ServiceProxy {
    pub fn new(
        client: Arc<RpcClient>,
        interface: impl Into<String>,
        timeout_ms: u64,
        serialization: Serialization,
    ) -> Self {
        Self {
            client,
            interface: interface.into(),
            timeout_ms,
            serialization,
        }
    }

    /// Proxy using the client's own timeout and serialization
    pub fn for_client(client: Arc<RpcClient>, interface: impl Into<String>) -> Self {
        let timeout_ms = client.config().timeout_ms;
        let serialization = client.config().serialization;
        Self::new(client, interface, timeout_ms, serialization)
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }

    fn request(&self, method: &MethodSignature, args: Vec<Value>) -> Request {
        let timeout = i32::try_from(self.timeout_ms).unwrap_or(i32::MAX);
        let header = RequestHeader::new(timeout).with_serialization(self.serialization);
        Request::new(header, RequestBody::for_method(&self.interface, method, args))
    }

    /// Call `method` and block until its result arrives
    ///
    /// Waits at most the configured timeout; 0 waits indefinitely.
    pub fn invoke(&self, method: &MethodSignature, args: Vec<Value>) -> Result<Value> {
        let request = self.request(method, args);
        let id = request.id();
        let handle = self.client.send_request(request)?;

        let timeout = (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms));
        match handle.wait(timeout) {
            Some(Outcome::Response(response)) => {
                self.client.release(&id);
                response.into_result()
            }
            Some(Outcome::Void) => {
                self.client.release(&id);
                Err(RpcError::Disconnected(format!(
                    "call {} to {} ended without a response",
                    id,
                    self.client.peer_addr()
                )))
            }
            None => {
                self.client.abandon(&id);
                self.client.release(&id);
                tracing::debug!(
                    "Call {} to {}.{} timed out",
                    id,
                    self.interface,
                    method.name
                );
                Err(RpcError::Timeout {
                    id: id.to_string(),
                    timeout_ms: self.timeout_ms,
                })
            }
        }
    }

    /// Call `method` and convert the result to `R`
    pub fn call<R: FromValue>(&self, method: &MethodSignature, args: Vec<Value>) -> Result<R> {
        self.invoke(method, args)?.into_typed()
    }

    /// Fire-and-forget call: the server runs it but sends no reply
    pub fn invoke_oneway(&self, method: &MethodSignature, args: Vec<Value>) -> Result<()> {
        let mut request = self.request(method, args);
        request.header = request.header.with_response_required(false);
        self.client.send_oneway(request)
    }
}

/// Hands out service proxies, sharing one connection per server address
#[derive(Default)]
pub struct ProxyFactory {
    clients: DashMap<String, Arc<RpcClient>>,
}

impl ProxyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a proxy for `interface` on the server named in `config`
    ///
    /// Reuses a live connection to the same address; a dead one is
    /// replaced.
    pub fn register_client_stub(
        &self,
        interface: &str,
        config: &ReferenceConfig,
    ) -> Result<ServiceProxy> {
        let client = match self.clients.entry(config.address()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_active() {
                    tracing::info!("Reconnecting to {}", entry.key());
                    entry.insert(Arc::new(RpcClient::connect(config.clone())?));
                }
                Arc::clone(entry.get())
            }
            Entry::Vacant(entry) => {
                let client = Arc::new(RpcClient::connect(config.clone())?);
                Arc::clone(entry.insert(client).value())
            }
        };

        tracing::debug!("Registered client stub {} -> {}", interface, config.address());
        Ok(ServiceProxy::new(
            client,
            interface,
            config.timeout_ms,
            config.serialization,
        ))
    }

    /// Open connections
    pub fn connections(&self) -> usize {
        self.clients.len()
    }

    /// Close every connection
    pub fn close(&self) {
        let addresses: Vec<String> = self.clients.iter().map(|e| e.key().clone()).collect();
        for address in addresses {
            if let Some((_, client)) = self.clients.remove(&address) {
                client.close();
            }
        }
    }
}
