//! Correlation ids
//!
//! Every request carries a 12-byte id that its response echoes back.
//! The 3-bit id-type field in the control word says how those 12 bytes
//! are laid out; only the ObjectId layout is defined.
//!
//! ## ObjectId Layout
//! ```text
//! ┌───────────────┬─────────────────────┬──────────────┐
//! │ Seconds (4)   │ Process random (5)  │ Counter (3)  │
//! └───────────────┴─────────────────────┴──────────────┘
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RpcError};

/// Length of a correlation id on the wire
pub const ID_LENGTH: usize = 12;

/// Id layout codes (3 bits in the control word)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IdType {
    ObjectId = 0,
}

impl IdType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(IdType::ObjectId),
            _ => Err(RpcError::Protocol(format!("Undefined id type: {}", code))),
        }
    }
}

/// 12-byte correlation id: timestamp, process-random, counter
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; ID_LENGTH]);

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

impl ObjectId {
    /// Generate a fresh id
    pub fn generate() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let process = PROCESS_UNIQUE.get_or_init(rand::random::<[u8; 5]>);
        let counter = COUNTER
            .get_or_init(|| AtomicU32::new(rand::random::<u32>() & 0x00FF_FFFF))
            .fetch_add(1, Ordering::Relaxed)
            & 0x00FF_FFFF;

        let mut bytes = [0u8; ID_LENGTH];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(process);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; ID_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ID_LENGTH] {
        &self.0
    }

    pub fn id_type(&self) -> IdType {
        IdType::ObjectId
    }

    /// Seconds since the epoch at generation time
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Parse the 24-digit hex form
    pub fn parse_hex(s: &str) -> Result<Self> {
        if s.len() != ID_LENGTH * 2 || !s.is_ascii() {
            return Err(RpcError::Protocol(format!("Invalid object id: {:?}", s)));
        }
        let mut bytes = [0u8; ID_LENGTH];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| RpcError::Protocol(format!("Invalid object id: {:?}", s)))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}
