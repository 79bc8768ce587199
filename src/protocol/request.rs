//! Request definitions
//!
//! Represents calls from clients.

use serde::{Deserialize, Serialize};

use crate::serialize::Serialization;

use super::{Event, Header, MethodSignature, ObjectId, TypeTag, Value};

/// Request header: shared fields plus client timeout and reply flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    header: Header,

    /// Client-relative timeout in ms, 0 = no limit
    timeout_millis: i32,

    /// Whether the sender waits for a response
    response_required: bool,
}

impl RequestHeader {
    /// Fresh header with a new correlation id
    pub fn new(timeout_millis: i32) -> Self {
        Self {
            header: Header::generate(),
            timeout_millis,
            response_required: true,
        }
    }

    /// Header rebuilt from decoded wire fields
    pub fn from_parts(header: Header, timeout_millis: i32, response_required: bool) -> Self {
        Self {
            header,
            timeout_millis,
            response_required,
        }
    }

    pub fn with_serialization(mut self, serialization: Serialization) -> Self {
        self.header.serialization = serialization;
        self
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.header.event = event;
        self
    }

    pub fn with_response_required(mut self, required: bool) -> Self {
        self.response_required = required;
        self
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn id(&self) -> ObjectId {
        self.header.id
    }

    pub fn serialization(&self) -> Serialization {
        self.header.serialization
    }

    pub fn event(&self) -> Event {
        self.header.event
    }

    pub fn timeout_millis(&self) -> i32 {
        self.timeout_millis
    }

    pub fn response_required(&self) -> bool {
        self.response_required
    }
}

/// What to call: interface, method and positional arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Fully-qualified service interface identity
    pub interface_name: String,
    pub method_name: String,
    pub return_type: TypeTag,
    pub parameter_types: Vec<TypeTag>,
    /// Positionally matched to `parameter_types`
    pub parameters: Vec<Value>,
}

impl RequestBody {
    /// Body for calling `method` on `interface` with `parameters`
    pub fn for_method(interface: &str, method: &MethodSignature, parameters: Vec<Value>) -> Self {
        Self {
            interface_name: interface.to_string(),
            method_name: method.name.to_string(),
            return_type: method.return_type,
            parameter_types: method.parameter_types.to_vec(),
            parameters,
        }
    }
}

/// A complete request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub header: RequestHeader,
    pub body: RequestBody,
}

impl Request {
    pub fn new(header: RequestHeader, body: RequestBody) -> Self {
        Self { header, body }
    }

    pub fn id(&self) -> ObjectId {
        self.header.id()
    }

    pub fn is_heartbeat(&self) -> bool {
        self.header.event() == Event::Heartbeat
    }
}
