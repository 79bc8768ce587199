//! Value Tests
//!
//! Tests for dynamic values, conversions and the container envelope.

use netrpc::protocol::{FromValue, TypeTag, Value};
use netrpc::serialize::{BincodeSerializer, Serialization, Serializer};
use netrpc::RpcError;

// =============================================================================
// Conversion Tests
// =============================================================================

#[test]
fn test_into_and_from_value() {
    assert_eq!(Value::from("hi").into_typed::<String>().unwrap(), "hi");
    assert_eq!(Value::from(7i32).into_typed::<i32>().unwrap(), 7);
    assert!(Value::from(true).into_typed::<bool>().unwrap());
    assert!(Value::from(()).into_typed::<()>().is_ok());
    assert_eq!(Value::from(1.5f64).into_typed::<f64>().unwrap(), 1.5);
}

#[test]
fn test_i32_widens_to_i64() {
    assert_eq!(i64::from_value(Value::I32(-3)).unwrap(), -3i64);
}

#[test]
fn test_list_conversion() {
    let value = Value::from(vec![1i32, 2, 3]);
    assert_eq!(value.type_tag(), TypeTag::List);
    assert_eq!(value.into_typed::<Vec<i32>>().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_conversion_mismatch() {
    let result = Value::from("nope").into_typed::<i32>();
    assert!(matches!(result, Err(RpcError::Conversion(_))));

    let result = Value::from(vec![Value::from(1i32), Value::from("x")]).into_typed::<Vec<i32>>();
    assert!(matches!(result, Err(RpcError::Conversion(_))));
}

#[test]
fn test_default_value_is_unit() {
    assert_eq!(Value::default(), Value::Unit);
    assert_eq!(Value::default().type_tag(), TypeTag::Unit);
}

// =============================================================================
// Envelope Tests
// =============================================================================

#[test]
fn test_scalar_value_round_trip() {
    let s = BincodeSerializer;
    let bytes = s.serialize_value(&Value::from("plain")).unwrap();

    assert_eq!(
        s.deserialize_value(&bytes, TypeTag::Str).unwrap(),
        Value::from("plain")
    );
}

#[test]
fn test_container_is_enveloped() {
    let s = Serialization::Bincode;
    let list = Value::from(vec![10i32, 20]);

    let wrapped = s.serialize_value(&list).unwrap();
    let bare = s.serialize(&list).unwrap();
    assert_ne!(wrapped, bare);

    assert_eq!(s.deserialize_value(&wrapped, TypeTag::List).unwrap(), list);
}

#[test]
fn test_map_value_round_trip() {
    let s = Serialization::Bincode;
    let map = Value::Map(vec![(Value::from("k"), Value::from(1i64))]);
    let bytes = s.serialize_value(&map).unwrap();

    assert_eq!(s.deserialize_value(&bytes, TypeTag::Map).unwrap(), map);
}

#[test]
fn test_wrong_target_type_rejected() {
    let s = Serialization::Bincode;
    let bytes = s.serialize_value(&Value::from(5i32)).unwrap();

    assert!(matches!(
        s.deserialize_value(&bytes, TypeTag::Str),
        Err(RpcError::Serialization(_))
    ));
}

// =============================================================================
// Serialization Code Tests
// =============================================================================

#[test]
fn test_serialization_codes() {
    assert_eq!(Serialization::Bincode.code(), 1);
    assert_eq!(Serialization::from_code(1).unwrap(), Serialization::Bincode);
    assert!(matches!(
        Serialization::from_code(0),
        Err(RpcError::Protocol(_))
    ));
    assert_eq!(Serialization::default(), Serialization::Bincode);
}

#[test]
fn test_serialization_name_parsing() {
    assert_eq!(
        "BinCode".parse::<Serialization>().unwrap(),
        Serialization::Bincode
    );
    assert!(matches!(
        "protostuff".parse::<Serialization>(),
        Err(RpcError::Config(_))
    ));
}
