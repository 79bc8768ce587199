//! Request dispatch
//!
//! Runs a request against the registry on the invoke pool and waits for
//! it under the effective timeout. Waiting can stop early; the business
//! call itself is never cancelled.
//!
//! ## Timeout Policy
//! ```text
//! client = request timeout (0 = unspecified), server = configured default
//!
//! effective        = server             if client == 0
//!                  = min(client, server) otherwise
//! server-attributed  if client == 0 or client >= server
//! ```
//! A server timeout of 0 defers to the client: the client's timeout
//! applies (unbounded if also 0) and expiry is client-attributed.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};

use crate::error::RpcError;
use crate::pool::WorkerPool;
use crate::protocol::{Request, RequestHeader, Response, ResponseBody, ResponseHeader, Status};

use super::registry::{InvokeError, ServiceRegistry};

/// Effective timeout for one request and who owns its expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// `None` = wait indefinitely
    pub effective: Option<Duration>,
    pub server_attributed: bool,
}

impl TimeoutPolicy {
    /// Reconcile the request's timeout with the server default
    ///
    /// Negative client timeouts count as unspecified. A server timeout of 0
    /// lifts the limit for every request; the client's own wait still
    /// applies on its side.
    pub fn resolve(client_ms: i32, server_ms: u64) -> Self {
        let client_ms = client_ms.max(0) as u64;

        if server_ms == 0 {
            return Self {
                effective: None,
                server_attributed: true,
            };
        }
        if client_ms == 0 {
            return Self {
                effective: Some(Duration::from_millis(server_ms)),
                server_attributed: true,
            };
        }
        Self {
            effective: Some(Duration::from_millis(client_ms.min(server_ms))),
            server_attributed: client_ms >= server_ms,
        }
    }

    /// Status reported when the wait expires
    pub fn timeout_status(&self) -> Status {
        if self.server_attributed {
            Status::ServerTimeout
        } else {
            Status::ClientTimeout
        }
    }
}

/// Build an error response answering `request`
pub fn error_response(request: &RequestHeader, status: Status, message: impl Into<String>) -> Response {
    Response::new(
        ResponseHeader::reply_to(request, status),
        ResponseBody::error(message, None),
    )
}

/// Runs requests against the registry
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    invoke_pool: Arc<WorkerPool>,
    server_timeout_ms: u64,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        invoke_pool: Arc<WorkerPool>,
        server_timeout_ms: u64,
    ) -> Self {
        Self {
            registry,
            invoke_pool,
            server_timeout_ms,
        }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Dispatch one request; `None` when no reply is expected
    ///
    /// Blocks the calling thread for at most the effective timeout.
    pub fn handle(&self, request: Request) -> Option<Response> {
        let Request { header, body } = request;
        let reply = header.response_required();

        if body.parameters.len() != body.parameter_types.len() {
            tracing::debug!(
                "Bad request {}: {} parameters for {} types",
                header.id(),
                body.parameters.len(),
                body.parameter_types.len()
            );
            return reply.then(|| {
                error_response(
                    &header,
                    Status::BadRequest,
                    format!(
                        "{}.{}: {} parameters for {} parameter types",
                        body.interface_name,
                        body.method_name,
                        body.parameters.len(),
                        body.parameter_types.len()
                    ),
                )
            });
        }

        let policy = TimeoutPolicy::resolve(header.timeout_millis(), self.server_timeout_ms);
        let target = format!("{}.{}", body.interface_name, body.method_name);
        let (tx, rx) = channel::bounded(1);
        let registry = Arc::clone(&self.registry);

        let submitted = self.invoke_pool.try_submit(move || {
            // Receiver may be gone after a timeout
            let _ = tx.send(registry.invoke(body));
        });
        if let Err(e) = submitted {
            tracing::warn!("Rejecting {} ({}): {}", header.id(), target, e);
            let status = match e {
                RpcError::PoolExhausted(_) => Status::ServerThreadpoolExhausted,
                _ => Status::ServerError,
            };
            return reply.then(|| error_response(&header, status, e.to_string()));
        }

        if !reply {
            return None;
        }

        let outcome = match policy.effective {
            Some(timeout) => rx.recv_timeout(timeout),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        let response = match outcome {
            Ok(Ok(value)) => Response::new(
                ResponseHeader::reply_to(&header, Status::Ok),
                ResponseBody::ok(value),
            ),
            Ok(Err(e @ (InvokeError::ServiceNotFound(_) | InvokeError::MethodNotFound { .. }))) => {
                error_response(&header, Status::ServiceNotFound, e.to_string())
            }
            Ok(Err(e @ InvokeError::BadArguments(_))) => {
                error_response(&header, Status::BadRequest, e.to_string())
            }
            Ok(Err(InvokeError::Failed(e))) => {
                tracing::debug!("{} failed: {}", target, e);
                Response::new(
                    ResponseHeader::reply_to(&header, Status::ServiceError),
                    ResponseBody::error(e.message, e.cause),
                )
            }
            Err(RecvTimeoutError::Timeout) => {
                let status = policy.timeout_status();
                tracing::debug!("{} for {} ({:?})", target, header.id(), status);
                error_response(
                    &header,
                    status,
                    format!(
                        "{} timed out after {} ms",
                        target,
                        policy.effective.map_or(0, |d| d.as_millis())
                    ),
                )
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::error!("{} ended without a result", target);
                error_response(
                    &header,
                    Status::ServerError,
                    format!("{} ended without a result", target),
                )
            }
        };

        Some(response)
    }
}
