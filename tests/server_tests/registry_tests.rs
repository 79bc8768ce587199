//! Registry Tests
//!
//! Tests for service registration and method resolution.

use std::sync::Arc;

use netrpc::protocol::{RequestBody, TypeTag, Value};
use netrpc::server::{InvokeError, MethodTable, Service, ServiceRegistry};
use netrpc::service::{hello_service, HELLO_SERVICE, RANDOM, SAY_HELLO};
use netrpc::RpcError;

fn hello_registry() -> ServiceRegistry {
    let registry = ServiceRegistry::new();
    registry.register_table(hello_service()).unwrap();
    registry
}

// =============================================================================
// Registration Tests
// =============================================================================

#[test]
fn test_register_and_lookup() {
    let registry = hello_registry();

    assert!(registry.contains(HELLO_SERVICE));
    assert!(registry.get(HELLO_SERVICE).is_some());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_duplicate_registration_rejected() {
    let registry = hello_registry();
    let result = registry.register_service(HELLO_SERVICE, Arc::new(hello_service()));

    assert!(matches!(result, Err(RpcError::Registry(_))));
}

#[test]
fn test_deregister() {
    let registry = hello_registry();

    assert!(registry.deregister(HELLO_SERVICE).is_some());
    assert!(registry.is_empty());
    assert!(registry.deregister(HELLO_SERVICE).is_none());
}

// =============================================================================
// Invocation Tests
// =============================================================================

#[test]
fn test_say_hello() {
    let registry = hello_registry();
    let body = RequestBody::for_method(HELLO_SERVICE, &SAY_HELLO, vec![Value::from("World")]);

    assert_eq!(registry.invoke(body).unwrap(), Value::from("Hello, World"));
}

#[test]
fn test_random_returns_ten_small_ints() {
    let registry = hello_registry();
    let body = RequestBody::for_method(HELLO_SERVICE, &RANDOM, vec![]);

    let numbers: Vec<i32> = registry.invoke(body).unwrap().into_typed().unwrap();
    assert_eq!(numbers.len(), 10);
    assert!(numbers.iter().all(|n| (0..999).contains(n)));
}

#[test]
fn test_missing_service() {
    let registry = ServiceRegistry::new();
    let body = RequestBody::for_method("netrpc.Nope", &SAY_HELLO, vec![Value::from("x")]);

    assert_eq!(
        registry.invoke(body),
        Err(InvokeError::ServiceNotFound("netrpc.Nope".into()))
    );
}

#[test]
fn test_method_table_resolves_by_name_and_types() {
    let table = hello_service();
    assert_eq!(table.len(), 2);

    let result = table.invoke("sayHello", &[TypeTag::Str], vec![Value::from("A")]);
    assert_eq!(result.unwrap(), Value::from("Hello, A"));

    let result = table.invoke("sayHello", &[TypeTag::I32], vec![Value::from(1i32)]);
    assert!(matches!(result, Err(InvokeError::MethodNotFound { .. })));
}

#[test]
fn test_method_table_checks_argument_types() {
    let table = hello_service();
    let result = table.invoke("sayHello", &[TypeTag::Str], vec![Value::from(5i32)]);

    assert!(matches!(result, Err(InvokeError::BadArguments(_))));
}

#[test]
fn test_custom_service_impl() {
    struct Upper;

    impl Service for Upper {
        fn invoke(
            &self,
            _method: &str,
            _parameter_types: &[TypeTag],
            parameters: Vec<Value>,
        ) -> Result<Value, InvokeError> {
            match parameters.first() {
                Some(Value::Str(s)) => Ok(Value::from(s.to_uppercase())),
                _ => Err(InvokeError::BadArguments("want a string".into())),
            }
        }
    }

    let registry = ServiceRegistry::new();
    registry.register_service("netrpc.test.Upper", Arc::new(Upper)).unwrap();
    let body = RequestBody {
        interface_name: "netrpc.test.Upper".into(),
        method_name: "upper".into(),
        return_type: TypeTag::Str,
        parameter_types: vec![TypeTag::Str],
        parameters: vec![Value::from("abc")],
    };

    assert_eq!(registry.invoke(body).unwrap(), Value::from("ABC"));
}

#[test]
fn test_empty_table() {
    let table = MethodTable::new("netrpc.test.Empty");

    assert!(table.is_empty());
    assert_eq!(table.interface(), "netrpc.test.Empty");
}
