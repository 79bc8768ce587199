//! Correlation Table Tests
//!
//! Tests for registering, settling and cleaning up pending calls.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use netrpc::client::CorrelationTable;
use netrpc::protocol::{
    Event, Header, ObjectId, Outcome, Response, ResponseBody, ResponseHeader, Status, Value,
};
use netrpc::serialize::Serialization;
use netrpc::RpcError;

fn response_for(id: ObjectId, text: &str) -> Response {
    let header = Header {
        id,
        serialization: Serialization::Bincode,
        event: Event::None,
    };
    Response::new(
        ResponseHeader::new(header, Status::Ok),
        ResponseBody::ok(Value::from(text)),
    )
}

// =============================================================================
// Register / Resolve Tests
// =============================================================================

#[test]
fn test_register_and_resolve() {
    let table = CorrelationTable::new();
    let id = ObjectId::generate();
    let handle = table.register(id).unwrap();

    assert!(table.resolve(response_for(id, "done")));
    assert!(handle.is_settled());

    match handle.wait(Some(Duration::from_secs(1))) {
        Some(Outcome::Response(r)) => assert_eq!(r.body.result, Value::from("done")),
        other => panic!("Expected response, got {:?}", other),
    }

    // Entry stays until released
    assert!(table.contains(&id));
    table.release(&id);
    assert!(table.is_empty());
}

#[test]
fn test_duplicate_id_rejected() {
    let table = CorrelationTable::new();
    let id = ObjectId::generate();
    table.register(id).unwrap();

    assert!(matches!(table.register(id), Err(RpcError::DuplicateId(_))));
}

#[test]
fn test_resolve_unknown_id_is_noop() {
    let table = CorrelationTable::new();

    assert!(!table.resolve(response_for(ObjectId::generate(), "stray")));
    assert!(table.is_empty());
}

#[test]
fn test_duplicate_response_does_not_resettle() {
    let table = CorrelationTable::new();
    let id = ObjectId::generate();
    let handle = table.register(id).unwrap();

    assert!(table.resolve(response_for(id, "first")));
    assert!(!table.resolve(response_for(id, "second")));
    assert!(!table.contains(&id));

    match handle.wait(None) {
        Some(Outcome::Response(r)) => assert_eq!(r.body.result, Value::from("first")),
        other => panic!("Expected first response, got {:?}", other),
    }
}

#[test]
fn test_waiter_blocks_until_resolved() {
    let table = Arc::new(CorrelationTable::new());
    let id = ObjectId::generate();
    let handle = table.register(id).unwrap();

    let resolver = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            table.resolve(response_for(id, "later"))
        })
    };

    let start = Instant::now();
    let outcome = handle.wait(Some(Duration::from_secs(5)));
    assert!(start.elapsed() >= Duration::from_millis(40));
    assert!(matches!(outcome, Some(Outcome::Response(_))));
    assert!(resolver.join().unwrap());
}

#[test]
fn test_wait_times_out() {
    let table = CorrelationTable::new();
    let handle = table.register(ObjectId::generate()).unwrap();

    let start = Instant::now();
    assert!(handle.wait(Some(Duration::from_millis(50))).is_none());
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(!handle.is_settled());
}

// =============================================================================
// Abandon Tests
// =============================================================================

#[test]
fn test_abandon_wakes_waiter_with_void() {
    let table = CorrelationTable::new();
    let id = ObjectId::generate();
    let handle = table.register(id).unwrap();

    table.abandon(&id);

    assert_eq!(handle.wait(Some(Duration::from_secs(1))), Some(Outcome::Void));
}

#[test]
fn test_abandon_then_late_response() {
    let table = CorrelationTable::new();
    let id = ObjectId::generate();
    let handle = table.register(id).unwrap();

    table.abandon(&id);
    // Late response: no panic, no resettle, residual entry removed
    assert!(!table.resolve(response_for(id, "too late")));
    assert!(!table.contains(&id));
    assert_eq!(handle.wait(None), Some(Outcome::Void));
}

#[test]
fn test_abandon_after_settle_removes_entry() {
    let table = CorrelationTable::new();
    let id = ObjectId::generate();
    let handle = table.register(id).unwrap();

    table.resolve(response_for(id, "won the race"));
    table.abandon(&id);

    assert!(!table.contains(&id));
    assert!(matches!(handle.wait(None), Some(Outcome::Response(_))));
}

#[test]
fn test_abandon_all_wakes_everyone() {
    let table = Arc::new(CorrelationTable::new());
    let handles: Vec<_> = (0..8)
        .map(|_| table.register(ObjectId::generate()).unwrap())
        .collect();

    let waiters: Vec<_> = handles
        .into_iter()
        .map(|h| thread::spawn(move || h.wait(Some(Duration::from_secs(5)))))
        .collect();

    thread::sleep(Duration::from_millis(20));
    assert_eq!(table.abandon_all(), 8);
    assert!(table.is_empty());

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap(), Some(Outcome::Void));
    }
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_calls_get_distinct_ids() {
    let table = Arc::new(CorrelationTable::new());
    let threads: Vec<_> = (0..8)
        .map(|_| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                (0..250)
                    .map(|_| {
                        let id = ObjectId::generate();
                        table.register(id).unwrap();
                        id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: Vec<ObjectId> = threads
        .into_iter()
        .flat_map(|t| t.join().unwrap())
        .collect();
    let unique: HashSet<_> = ids.iter().copied().collect();

    assert_eq!(ids.len(), 2000);
    assert_eq!(unique.len(), 2000);
    assert_eq!(table.len(), 2000);

    // Each response settles exactly one handle
    let settled = ids
        .iter()
        .filter(|id| table.resolve(response_for(**id, "ok")))
        .count();
    assert_eq!(settled, 2000);
}
