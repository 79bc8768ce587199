//! Stream framer
//!
//! Turns an arbitrary sequence of reads into complete frames. The body
//! length sits at a fixed header offset; the frame handed out keeps its
//! header so the codec can verify the checksum.
//!
//! ## States
//! ```text
//!   ReadingHeader ──(30 bytes)──▶ ReadingBody ──(len bytes)──▶ emit
//!        ▲                                                      │
//!        └──────────────────────────────────────────────────────┘
//! ```

use bytes::{Bytes, BytesMut};

use crate::error::{Result, RpcError};

use super::codec::{peek_body_length, HEADER_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadingHeader,
    /// Total frame length known
    ReadingBody(usize),
}

/// Accumulates bytes and emits complete frames
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
    max_frame_length: usize,
}

impl FrameBuffer {
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            state: State::ReadingHeader,
            max_frame_length,
        }
    }

    /// Feed bytes from the transport; returns every frame they complete
    ///
    /// An oversized frame is an error and leaves the buffer unusable; the
    /// caller is expected to drop the connection.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);
        let mut frames = Vec::new();

        loop {
            match self.state {
                State::ReadingHeader => {
                    let Some(body_length) = peek_body_length(&self.buffer) else {
                        break;
                    };
                    let total = HEADER_LENGTH.saturating_add(body_length);
                    if total > self.max_frame_length {
                        return Err(RpcError::FrameTooLarge {
                            length: total,
                            max: self.max_frame_length,
                        });
                    }
                    self.state = State::ReadingBody(total);
                }
                State::ReadingBody(total) => {
                    if self.buffer.len() < total {
                        break;
                    }
                    frames.push(self.buffer.split_to(total).freeze());
                    self.state = State::ReadingHeader;
                }
            }
        }

        Ok(frames)
    }

    /// Bytes held for an incomplete frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn max_frame_length(&self) -> usize {
        self.max_frame_length
    }
}
