//! Wire frame codec
//!
//! Encoding and decoding of complete frames.
//!
//! ## Frame Format (all fields big-endian)
//! ```text
//! ┌──────────┬───────────┬─────────────┬──────────┬──────────┐
//! │CRC32C (4)│ Magic (2) │ Control (2) │ Ser. (1) │Status (1)│
//! ├──────────┴───────────┴─────────────┴──────────┴──────────┤
//! │                 Correlation id (12)                      │
//! ├──────────────────────────┬───────────────────────────────┤
//! │     Timeout ms (4, i32)  │      Body length (4, u32)     │
//! ├──────────────────────────┴───────────────────────────────┤
//! │                 Body (serialized)                        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Control Word
//! ```text
//!  15   14   13..11   10..8    7..0
//! ┌───┬────┬────────┬────────┬──────────┐
//! │REQ│RESP│ Event  │ IdType │ reserved │
//! └───┴────┴────────┴────────┴──────────┘
//! ```
//! - REQ: 1 = request, 0 = response
//! - RESP: response required (requests only)
//!
//! The checksum is CRC-32C (Castagnoli) over bytes 4..end, everything after
//! the CRC field itself. The field is excluded from the checked region on
//! both sides.

use std::io::Write;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, RpcError};
use crate::serialize::{Serialization, Serializer};

use super::{
    Event, Header, IdType, ObjectId, Request, RequestBody, RequestHeader, Response,
    ResponseBody, ResponseHeader, Status, ID_LENGTH,
};

/// Magic number identifying a frame
pub const MAGIC: u16 = 0x02BC;

/// Fixed header size
pub const HEADER_LENGTH: usize = 30;

/// Default maximum body size (1 MiB)
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// Default maximum frame size: header plus body
pub const DEFAULT_MAX_FRAME_LENGTH: usize = HEADER_LENGTH + DEFAULT_MAX_PAYLOAD;

// Field offsets
pub const CRC_OFFSET: usize = 0;
pub const MAGIC_OFFSET: usize = 4;
pub const CONTROL_OFFSET: usize = 6;
pub const SERIALIZATION_OFFSET: usize = 8;
pub const STATUS_OFFSET: usize = 9;
pub const ID_OFFSET: usize = 10;
pub const TIMEOUT_OFFSET: usize = 22;
pub const BODY_LENGTH_OFFSET: usize = 26;

// Control word bits
const REQUEST_FLAG: u16 = 0x8000;
const RESPONSE_REQUIRED_FLAG: u16 = 0x4000;
const EVENT_MASK: u16 = 0x3800;
const EVENT_SHIFT: u16 = 11;
const ID_TYPE_MASK: u16 = 0x0700;
const ID_TYPE_SHIFT: u16 = 8;
const RESERVED_MASK: u16 = 0x00FF;

/// A decoded frame
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn id(&self) -> ObjectId {
        match self {
            Message::Request(r) => r.id(),
            Message::Response(r) => r.id(),
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a request frame
pub fn encode_request(request: &Request) -> Result<Bytes> {
    let header = &request.header;
    let mut control = REQUEST_FLAG;
    if header.response_required() {
        control |= RESPONSE_REQUIRED_FLAG;
    }
    let body = header.serialization().serialize(&request.body)?;

    write_frame(
        header.header(),
        control,
        0,
        header.timeout_millis(),
        &body,
    )
}

/// Encode a response frame
pub fn encode_response(response: &Response) -> Result<Bytes> {
    let header = &response.header;
    let body = header.header().serialization.serialize(&response.body)?;

    write_frame(header.header(), 0, header.status().code(), 0, &body)
}

/// Encode either kind of message
pub fn encode(message: &Message) -> Result<Bytes> {
    match message {
        Message::Request(r) => encode_request(r),
        Message::Response(r) => encode_response(r),
    }
}

fn write_frame(
    header: &Header,
    direction: u16,
    status: u8,
    timeout_millis: i32,
    body: &[u8],
) -> Result<Bytes> {
    let body_length = u32::try_from(body.len()).map_err(|_| RpcError::FrameTooLarge {
        length: HEADER_LENGTH + body.len(),
        max: HEADER_LENGTH + u32::MAX as usize,
    })?;

    let control = direction
        | ((header.event.code() as u16) << EVENT_SHIFT) & EVENT_MASK
        | ((header.id.id_type().code() as u16) << ID_TYPE_SHIFT) & ID_TYPE_MASK;

    let mut buf = BytesMut::with_capacity(HEADER_LENGTH + body.len());
    buf.put_u32(0); // CRC placeholder
    buf.put_u16(MAGIC);
    buf.put_u16(control);
    buf.put_u8(header.serialization.code());
    buf.put_u8(status);
    buf.put_slice(header.id.as_bytes());
    buf.put_i32(timeout_millis);
    buf.put_u32(body_length);
    buf.put_slice(body);

    let crc = crc32c::crc32c(&buf[MAGIC_OFFSET..]);
    buf[CRC_OFFSET..MAGIC_OFFSET].copy_from_slice(&crc.to_be_bytes());

    Ok(buf.freeze())
}

/// Encode and write a frame to a stream
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<()> {
    let bytes = encode(message)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode one complete frame
///
/// Checks run in order: length, magic, checksum, control word, codes,
/// body length. Any failure means the frame can't be trusted.
pub fn decode(frame: &[u8]) -> Result<Message> {
    if frame.len() < HEADER_LENGTH {
        return Err(RpcError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_LENGTH,
            frame.len()
        )));
    }

    let mut buf = frame;
    let stored_crc = buf.get_u32();
    let magic = buf.get_u16();
    if magic != MAGIC {
        return Err(RpcError::BadMagic(magic));
    }

    let computed_crc = crc32c::crc32c(&frame[MAGIC_OFFSET..]);
    if stored_crc != computed_crc {
        return Err(RpcError::ChecksumMismatch {
            stored: stored_crc,
            computed: computed_crc,
        });
    }

    let control = buf.get_u16();
    if control & RESERVED_MASK != 0 {
        return Err(RpcError::Protocol(format!(
            "Reserved control bits set: 0x{:04x}",
            control
        )));
    }
    let is_request = control & REQUEST_FLAG != 0;
    let response_required = control & RESPONSE_REQUIRED_FLAG != 0;
    let event = Event::from_code(((control & EVENT_MASK) >> EVENT_SHIFT) as u8)?;
    IdType::from_code(((control & ID_TYPE_MASK) >> ID_TYPE_SHIFT) as u8)?;

    let serialization = Serialization::from_code(buf.get_u8())?;
    let status_code = buf.get_u8();

    let mut id = [0u8; ID_LENGTH];
    buf.copy_to_slice(&mut id);
    let timeout_millis = buf.get_i32();
    let body_length = buf.get_u32() as usize;

    if body_length != frame.len() - HEADER_LENGTH {
        return Err(RpcError::Protocol(format!(
            "Body length mismatch: header says {}, frame carries {}",
            body_length,
            frame.len() - HEADER_LENGTH
        )));
    }

    let header = Header {
        id: ObjectId::from_bytes(id),
        serialization,
        event,
    };
    let body = &frame[HEADER_LENGTH..];

    if is_request {
        let body: RequestBody = serialization.deserialize(body)?;
        Ok(Message::Request(Request::new(
            RequestHeader::from_parts(header, timeout_millis, response_required),
            body,
        )))
    } else {
        let status = Status::from_code(status_code)?;
        let body: ResponseBody = serialization.deserialize(body)?;
        Ok(Message::Response(Response::new(
            ResponseHeader::new(header, status),
            body,
        )))
    }
}

/// Body length field of a (possibly partial) frame, if the header is present
pub fn peek_body_length(bytes: &[u8]) -> Option<usize> {
    let field = bytes.get(BODY_LENGTH_OFFSET..BODY_LENGTH_OFFSET + 4)?;
    Some(u32::from_be_bytes([field[0], field[1], field[2], field[3]]) as usize)
}
