//! Framer Tests
//!
//! Tests for splitting a byte stream into frames.

use bytes::Bytes;
use netrpc::protocol::{
    decode, encode_request, FrameBuffer, Message, Request, RequestBody, RequestHeader, Value,
    DEFAULT_MAX_FRAME_LENGTH, HEADER_LENGTH,
};
use netrpc::service::{HELLO_SERVICE, SAY_HELLO};
use netrpc::RpcError;

fn frame(name: &str) -> Bytes {
    let request = Request::new(
        RequestHeader::new(0),
        RequestBody::for_method(HELLO_SERVICE, &SAY_HELLO, vec![Value::from(name)]),
    );
    encode_request(&request).unwrap()
}

fn name_of(frame: &[u8]) -> String {
    match decode(frame).unwrap() {
        Message::Request(r) => r.body.parameters[0].as_str().unwrap().to_string(),
        _ => panic!("Expected request"),
    }
}

// =============================================================================
// Fragmentation Tests
// =============================================================================

#[test]
fn test_single_complete_frame() {
    let mut framer = FrameBuffer::new(DEFAULT_MAX_FRAME_LENGTH);
    let f = frame("alice");

    let frames = framer.push(&f).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0], f);
    assert_eq!(framer.buffered(), 0);
}

#[test]
fn test_byte_at_a_time() {
    let mut framer = FrameBuffer::new(DEFAULT_MAX_FRAME_LENGTH);
    let f = frame("bob");
    let mut out = Vec::new();

    for byte in f.iter() {
        out.extend(framer.push(&[*byte]).unwrap());
    }

    assert_eq!(out.len(), 1);
    assert_eq!(name_of(&out[0]), "bob");
}

#[test]
fn test_split_inside_header() {
    let mut framer = FrameBuffer::new(DEFAULT_MAX_FRAME_LENGTH);
    let f = frame("carol");

    assert!(framer.push(&f[..HEADER_LENGTH - 3]).unwrap().is_empty());
    assert_eq!(framer.buffered(), HEADER_LENGTH - 3);

    let frames = framer.push(&f[HEADER_LENGTH - 3..]).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(name_of(&frames[0]), "carol");
}

// =============================================================================
// Coalescing Tests
// =============================================================================

#[test]
fn test_coalesced_frames() {
    let mut framer = FrameBuffer::new(DEFAULT_MAX_FRAME_LENGTH);
    let mut stream = Vec::new();
    for name in ["a", "bb", "ccc"] {
        stream.extend_from_slice(&frame(name));
    }

    let frames = framer.push(&stream).unwrap();
    let names: Vec<String> = frames.iter().map(|f| name_of(f)).collect();
    assert_eq!(names, vec!["a", "bb", "ccc"]);
}

#[test]
fn test_coalesced_with_trailing_partial() {
    let mut framer = FrameBuffer::new(DEFAULT_MAX_FRAME_LENGTH);
    let first = frame("first");
    let second = frame("second");

    let mut chunk = first.to_vec();
    chunk.extend_from_slice(&second[..10]);

    let frames = framer.push(&chunk).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(name_of(&frames[0]), "first");

    let frames = framer.push(&second[10..]).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(name_of(&frames[0]), "second");
}

// =============================================================================
// Limit Tests
// =============================================================================

#[test]
fn test_oversized_frame_rejected() {
    let f = frame(&"x".repeat(200));
    let mut framer = FrameBuffer::new(HEADER_LENGTH + 16);

    let result = framer.push(&f[..HEADER_LENGTH]);
    match result {
        Err(RpcError::FrameTooLarge { length, max }) => {
            assert_eq!(length, f.len());
            assert_eq!(max, HEADER_LENGTH + 16);
        }
        other => panic!("Expected FrameTooLarge, got {:?}", other),
    }
}

#[test]
fn test_frame_at_limit_accepted() {
    let f = frame("limit");
    let mut framer = FrameBuffer::new(f.len());

    assert_eq!(framer.push(&f).unwrap().len(), 1);
}
