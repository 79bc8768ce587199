//! Demo greeting service

use rand::Rng;

use crate::client::ServiceProxy;
use crate::error::Result;
use crate::protocol::{MethodSignature, TypeTag, Value};
use crate::server::{MethodTable, ServiceError};

pub const HELLO_SERVICE: &str = "netrpc.demo.HelloService";

/// `String sayHello(String name)`
pub const SAY_HELLO: MethodSignature = MethodSignature {
    name: "sayHello",
    parameter_types: &[TypeTag::Str],
    return_type: TypeTag::Str,
};

/// `List<Integer> random()`
pub const RANDOM: MethodSignature = MethodSignature {
    name: "random",
    parameter_types: &[],
    return_type: TypeTag::List,
};

/// Server-side implementation
pub fn hello_service() -> MethodTable {
    MethodTable::new(HELLO_SERVICE)
        .method(&SAY_HELLO, |params| {
            let name = params
                .into_iter()
                .next()
                .and_then(|v| match v {
                    Value::Str(s) => Some(s),
                    _ => None,
                })
                .ok_or_else(|| ServiceError::new("sayHello expects a name"))?;
            Ok(Value::from(format!("Hello, {}", name)))
        })
        .method(&RANDOM, |_| {
            let mut rng = rand::thread_rng();
            let numbers: Vec<i32> = (0..10).map(|_| rng.gen_range(0..999)).collect();
            Ok(Value::from(numbers))
        })
}

/// Typed client stub
#[derive(Clone)]
pub struct HelloServiceClient {
    proxy: ServiceProxy,
}

impl HelloServiceClient {
    pub fn new(proxy: ServiceProxy) -> Self {
        Self { proxy }
    }

    pub fn say_hello(&self, name: &str) -> Result<String> {
        self.proxy.call(&SAY_HELLO, vec![Value::from(name)])
    }

    pub fn random(&self) -> Result<Vec<i32>> {
        self.proxy.call(&RANDOM, Vec::new())
    }
}
