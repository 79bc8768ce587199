//! Payload serializers
//!
//! Bodies are encoded by the serializer named in the frame header. The
//! mapping from header code to implementation is fixed at compile time:
//! `Serialization` is both the code and the dispatcher, so sender and
//! receiver always agree.
//!
//! ## Codes
//! - 0x01: bincode

mod bincode;

pub use self::bincode::BincodeSerializer;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RpcError};
use crate::protocol::{TypeTag, Value};

/// Serialization codes carried in the frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Serialization {
    #[default]
    Bincode = 1,
}

impl Serialization {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Serialization::Bincode),
            _ => Err(RpcError::Protocol(format!(
                "Unknown serialization code: 0x{:02x}",
                code
            ))),
        }
    }
}

impl fmt::Display for Serialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Serialization::Bincode => write!(f, "bincode"),
        }
    }
}

impl FromStr for Serialization {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bincode" => Ok(Serialization::Bincode),
            other => Err(RpcError::Config(format!(
                "Unsupported serialization: {}",
                other
            ))),
        }
    }
}

/// Single-field wrapper for container values
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    data: Value,
}

/// Encode/decode capability for message bodies
pub trait Serializer {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Encode a standalone value, wrapping containers in an envelope
    fn serialize_value(&self, value: &Value) -> Result<Vec<u8>> {
        if value.type_tag().is_container() {
            self.serialize(&Envelope {
                data: value.clone(),
            })
        } else {
            self.serialize(value)
        }
    }

    /// Decode a standalone value of shape `target`
    fn deserialize_value(&self, bytes: &[u8], target: TypeTag) -> Result<Value> {
        let value = if target.is_container() {
            self.deserialize::<Envelope>(bytes)?.data
        } else {
            self.deserialize::<Value>(bytes)?
        };
        if value.type_tag() != target {
            return Err(RpcError::Serialization(format!(
                "expected {:?}, decoded {:?}",
                target,
                value.type_tag()
            )));
        }
        Ok(value)
    }
}

impl Serializer for Serialization {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            Serialization::Bincode => BincodeSerializer.serialize(value),
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            Serialization::Bincode => BincodeSerializer.deserialize(bytes),
        }
    }
}
