//! Service registry
//!
//! Maps an interface name to its implementation. Implementations resolve
//! methods by name and parameter types, so overloads are separate entries.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{Result, RpcError};
use crate::protocol::{MethodSignature, RequestBody, TypeTag, Value};

/// Failure raised by a business method
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceError {
    pub message: String,
    /// Underlying cause, shipped to the client when present
    pub cause: Option<String>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<RpcError> for ServiceError {
    fn from(e: RpcError) -> Self {
        ServiceError::new(e.to_string())
    }
}

/// Why an invocation produced no value
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeError {
    /// No implementation registered for the interface
    ServiceNotFound(String),

    /// Interface found, no method with that name and parameter types
    MethodNotFound { interface: String, method: String },

    /// Parameters don't line up with the declared types
    BadArguments(String),

    /// The method ran and failed
    Failed(ServiceError),
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::ServiceNotFound(interface) => {
                write!(f, "Service not found: {}", interface)
            }
            InvokeError::MethodNotFound { interface, method } => {
                write!(f, "Method not found: {}.{}", interface, method)
            }
            InvokeError::BadArguments(msg) => write!(f, "Bad arguments: {}", msg),
            InvokeError::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// A callable service implementation
pub trait Service: Send + Sync {
    /// Run `method` resolved by name and parameter types
    fn invoke(
        &self,
        method: &str,
        parameter_types: &[TypeTag],
        parameters: Vec<Value>,
    ) -> std::result::Result<Value, InvokeError>;
}

type Handler = Box<dyn Fn(Vec<Value>) -> std::result::Result<Value, ServiceError> + Send + Sync>;

/// Table-driven `Service`: one closure per method signature
#[derive(Default)]
pub struct MethodTable {
    interface: String,
    methods: HashMap<(String, Vec<TypeTag>), Handler>,
}

impl MethodTable {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            methods: HashMap::new(),
        }
    }

    /// Add a method
    pub fn method<F>(mut self, signature: &MethodSignature, handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> std::result::Result<Value, ServiceError> + Send + Sync + 'static,
    {
        let key = (
            signature.name.to_string(),
            signature.parameter_types.to_vec(),
        );
        self.methods.insert(key, Box::new(handler));
        self
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl Service for MethodTable {
    fn invoke(
        &self,
        method: &str,
        parameter_types: &[TypeTag],
        parameters: Vec<Value>,
    ) -> std::result::Result<Value, InvokeError> {
        let key = (method.to_string(), parameter_types.to_vec());
        let handler = self
            .methods
            .get(&key)
            .ok_or_else(|| InvokeError::MethodNotFound {
                interface: self.interface.clone(),
                method: method.to_string(),
            })?;

        for (i, (param, expected)) in parameters.iter().zip(parameter_types).enumerate() {
            if param.type_tag() != *expected {
                return Err(InvokeError::BadArguments(format!(
                    "parameter {} of {}: expected {:?}, got {:?}",
                    i,
                    method,
                    expected,
                    param.type_tag()
                )));
            }
        }

        handler(parameters).map_err(InvokeError::Failed)
    }
}

/// Interface name to implementation, shared by all connections
#[derive(Default)]
pub struct ServiceRegistry {
    services: DashMap<String, Arc<dyn Service>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` under `interface`; fails if the name is taken
    pub fn register_service(&self, interface: &str, service: Arc<dyn Service>) -> Result<()> {
        use dashmap::mapref::entry::Entry;

        match self.services.entry(interface.to_string()) {
            Entry::Occupied(_) => Err(RpcError::Registry(format!(
                "Service already registered: {}",
                interface
            ))),
            Entry::Vacant(slot) => {
                slot.insert(service);
                tracing::info!("Registered service {}", interface);
                Ok(())
            }
        }
    }

    /// Register a method table under its own interface name
    pub fn register_table(&self, table: MethodTable) -> Result<()> {
        let interface = table.interface().to_string();
        self.register_service(&interface, Arc::new(table))
    }

    pub fn deregister(&self, interface: &str) -> Option<Arc<dyn Service>> {
        self.services.remove(interface).map(|(_, service)| service)
    }

    pub fn get(&self, interface: &str) -> Option<Arc<dyn Service>> {
        self.services.get(interface).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, interface: &str) -> bool {
        self.services.contains_key(interface)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Look up the body's interface and run the method
    pub fn invoke(&self, body: RequestBody) -> std::result::Result<Value, InvokeError> {
        let service = self
            .get(&body.interface_name)
            .ok_or_else(|| InvokeError::ServiceNotFound(body.interface_name.clone()))?;

        service.invoke(&body.method_name, &body.parameter_types, body.parameters)
    }
}
