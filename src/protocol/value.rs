//! Dynamic values
//!
//! Request parameters and response results travel as `Value`s so one wire
//! format serves every interface. `TypeTag` describes a value's shape and is
//! what method signatures are written in.
//!
//! Lists and maps may nest at most `MAX_VALUE_DEPTH` levels. Both directions
//! of serialization enforce the limit, so a hostile body fails to decode
//! instead of exhausting the reader's stack.

use std::cell::Cell;

use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, RpcError};

/// Deepest nesting of values (the outermost value counts as 1)
pub const MAX_VALUE_DEPTH: usize = 64;

/// Shape of a value (parameter types, return types)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Unit,
    Bool,
    I32,
    I64,
    F64,
    Str,
    Bytes,
    List,
    Map,
}

impl TypeTag {
    /// Containers get wrapped in an envelope by serializers that can't
    /// express them at the top level
    pub fn is_container(self) -> bool {
        matches!(self, TypeTag::List | TypeTag::Map)
    }
}

/// A dynamically typed value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Unit,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Unit => TypeTag::Unit,
            Value::Bool(_) => TypeTag::Bool,
            Value::I32(_) => TypeTag::I32,
            Value::I64(_) => TypeTag::I64,
            Value::F64(_) => TypeTag::F64,
            Value::Str(_) => TypeTag::Str,
            Value::Bytes(_) => TypeTag::Bytes,
            Value::List(_) => TypeTag::List,
            Value::Map(_) => TypeTag::Map,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into a Rust type
    pub fn into_typed<T: FromValue>(self) -> Result<T> {
        T::from_value(self)
    }
}

// =============================================================================
// Wire Representation
// =============================================================================

thread_local! {
    static DEPTH: Cell<usize> = Cell::new(0);
}

/// One level of value nesting on the current thread
struct DepthGuard;

impl DepthGuard {
    fn enter() -> std::result::Result<Self, String> {
        DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > MAX_VALUE_DEPTH {
                return Err(format!(
                    "value nested deeper than {} levels",
                    MAX_VALUE_DEPTH
                ));
            }
            depth.set(next);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

const VALUE: &str = "Value";

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let _guard = DepthGuard::enter().map_err(<S::Error as ser::Error>::custom)?;
        match self {
            Value::Unit => serializer.serialize_unit_variant(VALUE, 0, "Unit"),
            Value::Bool(v) => serializer.serialize_newtype_variant(VALUE, 1, "Bool", v),
            Value::I32(v) => serializer.serialize_newtype_variant(VALUE, 2, "I32", v),
            Value::I64(v) => serializer.serialize_newtype_variant(VALUE, 3, "I64", v),
            Value::F64(v) => serializer.serialize_newtype_variant(VALUE, 4, "F64", v),
            Value::Str(v) => serializer.serialize_newtype_variant(VALUE, 5, "Str", v),
            Value::Bytes(v) => serializer.serialize_newtype_variant(VALUE, 6, "Bytes", v),
            Value::List(v) => serializer.serialize_newtype_variant(VALUE, 7, "List", v),
            Value::Map(v) => serializer.serialize_newtype_variant(VALUE, 8, "Map", v),
        }
    }
}

/// Same variants and order as `Value`; nested values recurse through
/// `Value`'s own impl so every level passes the depth guard
#[derive(Deserialize)]
#[serde(rename = "Value")]
enum WireValue {
    Unit,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl From<WireValue> for Value {
    fn from(wire: WireValue) -> Self {
        match wire {
            WireValue::Unit => Value::Unit,
            WireValue::Bool(v) => Value::Bool(v),
            WireValue::I32(v) => Value::I32(v),
            WireValue::I64(v) => Value::I64(v),
            WireValue::F64(v) => Value::F64(v),
            WireValue::Str(v) => Value::Str(v),
            WireValue::Bytes(v) => Value::Bytes(v),
            WireValue::List(v) => Value::List(v),
            WireValue::Map(v) => Value::Map(v),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let _guard = DepthGuard::enter().map_err(<D::Error as de::Error>::custom)?;
        WireValue::deserialize(deserializer).map(Value::from)
    }
}

/// Static description of an interface method
///
/// Shared by client stubs (to build requests) and server method tables
/// (to resolve them).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: &'static str,
    pub parameter_types: &'static [TypeTag],
    pub return_type: TypeTag,
}

// =============================================================================
// Conversions into Value
// =============================================================================

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Conversions out of Value
// =============================================================================

/// Fallible conversion from a `Value`
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: TypeTag, found: &Value) -> RpcError {
    RpcError::Conversion(format!(
        "expected {:?}, found {:?}",
        expected,
        found.type_tag()
    ))
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Unit => Ok(()),
            other => Err(mismatch(TypeTag::Unit, &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(mismatch(TypeTag::Bool, &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::I32(v) => Ok(v),
            other => Err(mismatch(TypeTag::I32, &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::I64(v) => Ok(v),
            Value::I32(v) => Ok(v as i64),
            other => Err(mismatch(TypeTag::I64, &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::F64(v) => Ok(v),
            other => Err(mismatch(TypeTag::F64, &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(v) => Ok(v),
            other => Err(mismatch(TypeTag::Str, &other)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch(TypeTag::List, &other)),
        }
    }
}
