//! Config Tests
//!
//! Tests for defaults, builders and validation.

use std::time::Duration;

use netrpc::config::DEFAULT_PORT;
use netrpc::protocol::{DEFAULT_MAX_FRAME_LENGTH, HEADER_LENGTH};
use netrpc::serialize::Serialization;
use netrpc::{ClientConfig, RpcError, ServerConfig};

// =============================================================================
// Client Config Tests
// =============================================================================

#[test]
fn test_client_defaults() {
    let config = ClientConfig::default();

    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.connect_timeout_ms, 3000);
    assert_eq!(config.write_idle_ms, 2000);
    assert_eq!(config.timeout_ms, 0);
    assert_eq!(config.serialization, Serialization::Bincode);
    assert_eq!(config.max_frame_length, DEFAULT_MAX_FRAME_LENGTH);
    assert_eq!(DEFAULT_MAX_FRAME_LENGTH, HEADER_LENGTH + 1024 * 1024);
    assert!(config.validate().is_ok());
}

#[test]
fn test_client_builder() {
    let config = ClientConfig::builder()
        .host("localhost")
        .port(30000)
        .timeout_ms(250)
        .write_idle_ms(100)
        .worker_threads(2)
        .build();

    assert_eq!(config.address(), "localhost:30000");
    assert_eq!(config.timeout_ms, 250);
    assert!(config.validate().is_ok());
}

#[test]
fn test_client_rejects_low_port() {
    let config = ClientConfig::builder().port(80).build();
    assert!(matches!(config.validate(), Err(RpcError::Config(_))));
}

#[test]
fn test_client_rejects_unresolvable_host() {
    let config = ClientConfig::builder().host("no such host!").build();
    assert!(matches!(config.validate(), Err(RpcError::Config(_))));
}

#[test]
fn test_client_rejects_oversized_timeout() {
    let config = ClientConfig::builder().timeout_ms(i32::MAX as u64 + 1).build();
    assert!(matches!(config.validate(), Err(RpcError::Config(_))));
}

#[test]
fn test_client_rejects_zero_idle() {
    let config = ClientConfig::builder().write_idle_ms(0).build();
    assert!(matches!(config.validate(), Err(RpcError::Config(_))));
}

// =============================================================================
// Server Config Tests
// =============================================================================

#[test]
fn test_server_defaults() {
    let config = ServerConfig::default();

    assert_eq!(config.read_idle_ms, 5000);
    assert_eq!(config.timeout_ms, 5000);
    assert_eq!(config.worker_threads, 16);
    assert_eq!(config.write_timeout(), Duration::from_millis(3000));
    // Read-idle stays a healthy multiple of the client heartbeat interval
    assert!(config.read_idle_ms >= 2 * ClientConfig::default().write_idle_ms);
    assert!(config.validate().is_ok());
}

#[test]
fn test_server_accepts_ephemeral_port() {
    let config = ServerConfig::builder().listen_addr("127.0.0.1:0").build();
    assert!(config.validate().is_ok());
}

#[test]
fn test_server_rejects_tiny_frame_limit() {
    let config = ServerConfig::builder()
        .max_frame_length(HEADER_LENGTH - 1)
        .build();
    assert!(matches!(config.validate(), Err(RpcError::Config(_))));
}

#[test]
fn test_server_rejects_empty_pools() {
    let config = ServerConfig::builder().worker_queue_capacity(0).build();
    assert!(matches!(config.validate(), Err(RpcError::Config(_))));
}

#[test]
fn test_server_rejects_unbounded_writes() {
    let config = ServerConfig::builder().write_timeout_ms(0).build();
    assert!(matches!(config.validate(), Err(RpcError::Config(_))));
}
