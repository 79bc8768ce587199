//! Response definitions
//!
//! Represents responses to clients.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RpcError};

use super::{Header, ObjectId, RequestHeader, Value};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 1,
    ClientTimeout = 2,
    ServerTimeout = 3,
    /// Channel inactive; unfinished requests return directly
    ChannelInactive = 4,
    BadRequest = 5,
    BadResponse = 6,
    ServiceError = 7,
    ServiceNotFound = 8,
    ServerError = 9,
    ClientError = 10,
    /// Server worker pool full; quick return
    ServerThreadpoolExhausted = 11,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        let status = match code {
            1 => Status::Ok,
            2 => Status::ClientTimeout,
            3 => Status::ServerTimeout,
            4 => Status::ChannelInactive,
            5 => Status::BadRequest,
            6 => Status::BadResponse,
            7 => Status::ServiceError,
            8 => Status::ServiceNotFound,
            9 => Status::ServerError,
            10 => Status::ClientError,
            11 => Status::ServerThreadpoolExhausted,
            _ => {
                return Err(RpcError::Protocol(format!(
                    "Unknown response status: 0x{:02x}",
                    code
                )))
            }
        };
        Ok(status)
    }
}

/// Response header: shared fields plus status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    header: Header,
    status: Status,
}

impl ResponseHeader {
    pub fn new(header: Header, status: Status) -> Self {
        Self { header, status }
    }

    /// Header answering `request`: id, event and codec copied verbatim
    pub fn reply_to(request: &RequestHeader, status: Status) -> Self {
        Self {
            header: Header::reply_to(request.header()),
            status,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn id(&self) -> ObjectId {
        self.header.id
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

/// Call result: the value on success, or error message plus cause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    pub success: bool,

    /// Return value, or on failure the carried cause (Unit when none)
    pub result: Value,

    pub error_msg: Option<String>,
}

impl ResponseBody {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result,
            error_msg: None,
        }
    }

    pub fn error(message: impl Into<String>, cause: Option<String>) -> Self {
        Self {
            success: false,
            result: cause.map(Value::Str).unwrap_or(Value::Unit),
            error_msg: Some(message.into()),
        }
    }

    /// Cause text carried on a failed call
    pub fn cause(&self) -> Option<String> {
        match (&self.success, &self.result) {
            (false, Value::Str(cause)) => Some(cause.clone()),
            _ => None,
        }
    }
}

/// A complete response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub header: ResponseHeader,
    pub body: ResponseBody,
}

impl Response {
    pub fn new(header: ResponseHeader, body: ResponseBody) -> Self {
        Self { header, body }
    }

    pub fn id(&self) -> ObjectId {
        self.header.id()
    }

    pub fn status(&self) -> Status {
        self.header.status()
    }

    /// Turn the wire status into the call's result
    pub fn into_result(self) -> Result<Value> {
        match self.header.status() {
            Status::Ok => Ok(self.body.result),
            status => {
                let cause = self.body.cause();
                Err(RpcError::Remote {
                    status,
                    message: self.body.error_msg.unwrap_or_default(),
                    cause,
                })
            }
        }
    }
}

/// How a pending call was settled
///
/// `Void` only unblocks a waiter; it has no header or body and the codec
/// has no way to put it on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Response(Response),
    Void,
}
