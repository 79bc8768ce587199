//! Shared request/response header fields

use crate::error::{Result, RpcError};
use crate::serialize::Serialization;

use super::ObjectId;

/// Event tag carried in 3 bits of the control word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Event {
    /// Ordinary call
    #[default]
    None = 0,
    Heartbeat = 1,
    FileUpload = 2,
}

impl Event {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Event::None),
            1 => Ok(Event::Heartbeat),
            2 => Ok(Event::FileUpload),
            _ => Err(RpcError::Protocol(format!("Unknown event code: {}", code))),
        }
    }
}

/// Metadata common to requests and responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Correlation id; a response copies its request's id
    pub id: ObjectId,

    /// Payload codec used for the body
    pub serialization: Serialization,

    /// Event tag (NONE for ordinary calls)
    pub event: Event,
}

impl Header {
    /// Header with a freshly generated id and default codec
    pub fn generate() -> Self {
        Self {
            id: ObjectId::generate(),
            serialization: Serialization::default(),
            event: Event::None,
        }
    }

    /// Header for a message answering `request`: same id, event and codec
    pub fn reply_to(request: &Header) -> Self {
        *request
    }
}
