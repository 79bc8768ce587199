//! Service contracts
//!
//! Reserved identities used by the runtime itself, and the demo service
//! shipped with the binaries.

mod hello;

pub use hello::{hello_service, HelloServiceClient, HELLO_SERVICE, RANDOM, SAY_HELLO};

use crate::protocol::{Event, MethodSignature, Request, RequestBody, RequestHeader, TypeTag};
use crate::serialize::Serialization;

/// Interface heartbeats are addressed to
pub const HEARTBEAT_SERVICE: &str = "netrpc.HeartbeatService";

/// `String ping()`
pub const PING: MethodSignature = MethodSignature {
    name: "ping",
    parameter_types: &[],
    return_type: TypeTag::Str,
};

/// Keep-alive request: HEARTBEAT event, no reply expected
pub fn heartbeat_request(serialization: Serialization) -> Request {
    let header = RequestHeader::new(0)
        .with_serialization(serialization)
        .with_event(Event::Heartbeat)
        .with_response_required(false);
    Request::new(
        header,
        RequestBody::for_method(HEARTBEAT_SERVICE, &PING, Vec::new()),
    )
}
