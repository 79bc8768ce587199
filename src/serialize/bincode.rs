//! bincode payload serializer

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

use super::Serializer;

/// Compact binary encoding via bincode's default options
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl Serializer for BincodeSerializer {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(::bincode::serialize(value)?)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(::bincode::deserialize(bytes)?)
    }
}
