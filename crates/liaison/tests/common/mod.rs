//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use liaison::domain::{Connection, ConnectionId, ConnectionStatus, Role, User, UserId};
use liaison::policy::PolicyMatrix;
use liaison::storage::in_memory::InMemoryStore;
use liaison::storage::NetworkStore;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

/// Fixed reference instant so latencies are deterministic.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// A named user.
pub fn user(id: &str, role: Role, first: &str, last: &str) -> User {
    User::new(id, role).with_name(first, last)
}

/// A connection record in `status`, created `offset_hours` after the base time
/// and last updated `latency_hours` later.
pub fn connection(
    id: &str,
    requester: &str,
    addressee: &str,
    status: ConnectionStatus,
    offset_hours: i64,
    latency_hours: i64,
) -> Connection {
    let created_at = base_time() + Duration::hours(offset_hours);
    let updated_at = created_at + Duration::hours(latency_hours);
    Connection {
        id: ConnectionId::new(id),
        requester_id: UserId::new(requester),
        addressee_id: UserId::new(addressee),
        status,
        connected_at: (status == ConnectionStatus::Accepted).then_some(updated_at),
        last_interacted_at: None,
        relationship_tag: None,
        notes: None,
        created_at,
        updated_at,
    }
}

/// An accepted connection, created `offset_hours` after the base time.
pub fn accepted(id: &str, requester: &str, addressee: &str, offset_hours: i64) -> Connection {
    connection(id, requester, addressee, ConnectionStatus::Accepted, offset_hours, 1)
}

/// Build a shared store from records, failing on any load warning.
pub fn store_from(users: Vec<User>, connections: Vec<Connection>) -> Arc<dyn NetworkStore> {
    let (store, warnings) = InMemoryStore::from_records(users, connections);
    assert!(warnings.is_empty(), "unexpected load warnings: {warnings:?}");
    Arc::new(store)
}

/// The built-in policy, shared.
pub fn builtin_policy() -> Arc<PolicyMatrix> {
    Arc::new(PolicyMatrix::builtin())
}

/// Run the liaison binary in the specified directory
pub fn run_liaison_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_liaison"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute liaison binary")
}
