//! Protocol Module
//!
//! Defines the message model and the wire protocol shared by client and
//! server.
//!
//! ## Frame Format
//! ```text
//! ┌──────────────────────────── 30-byte header ───────────────────────────┐
//! │CRC32C │ Magic │ Control │ Ser │ Status │ Id (12) │ Timeout │ Body len │
//! └───────────────────────────────────────────────────────────────────────┘
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                Body: RequestBody or ResponseBody                      │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Events
//! - 0: NONE      - ordinary call
//! - 1: HEARTBEAT - client keep-alive, never answered
//! - 2: FILE_UPLOAD
//!
//! ### Status Codes (responses only; requests carry 0)
//! - 1: OK
//! - 2: CLIENT_TIMEOUT
//! - 3: SERVER_TIMEOUT
//! - 4: CHANNEL_INACTIVE
//! - 5: BAD_REQUEST
//! - 6: BAD_RESPONSE
//! - 7: SERVICE_ERROR
//! - 8: SERVICE_NOT_FOUND
//! - 9: SERVER_ERROR
//! - 10: CLIENT_ERROR
//! - 11: SERVER_THREADPOOL_RESOURCE_EXHAUSTED

mod codec;
mod framer;
mod header;
mod id;
mod request;
mod response;
mod value;

pub use codec::{
    decode, encode, encode_request, encode_response, write_message, Message,
    DEFAULT_MAX_FRAME_LENGTH, DEFAULT_MAX_PAYLOAD, HEADER_LENGTH, MAGIC,
};
pub use framer::FrameBuffer;
pub use header::{Event, Header};
pub use id::{IdType, ObjectId, ID_LENGTH};
pub use request::{Request, RequestBody, RequestHeader};
pub use response::{Outcome, Response, ResponseBody, ResponseHeader, Status};
pub use value::{FromValue, MethodSignature, TypeTag, Value, MAX_VALUE_DEPTH};

/// Offsets of the header fields, for tools and tests that inspect raw frames
pub mod offsets {
    pub use super::codec::{
        BODY_LENGTH_OFFSET, CONTROL_OFFSET, CRC_OFFSET, ID_OFFSET, MAGIC_OFFSET,
        SERIALIZATION_OFFSET, STATUS_OFFSET, TIMEOUT_OFFSET,
    };
}
