//! In-memory storage backend using HashMap and petgraph.
//!
//! This module provides a fast, **ephemeral** store where all data is held in
//! RAM and **lost when the process exits** unless persisted with
//! [`save_to_jsonl`]. It is suitable for:
//!
//! - Testing and development
//! - Short-lived CLI sessions backed by JSONL files
//!
//! # Architecture
//!
//! The implementation uses:
//! - `HashMap<UserId, User>` and `HashMap<ConnectionId, Connection>` for O(1) lookups
//! - `petgraph::stable_graph::StableDiGraph` as the adjacency index: one node
//!   per user, one edge per connection (any status)
//! - `HashMap<UserId, NodeIndex>` and `HashMap<ConnectionId, EdgeIndex>` to
//!   locate graph elements; the stable graph keeps indices valid across deletes
//!
//! ## Edge Direction Convention
//!
//! Edges point **requester -> addressee** and carry the [`ConnectionId`] as
//! weight. Queries that treat the relation as undirected walk both
//! `Outgoing` and `Incoming` edges of a node.
//!
//! # Thread Safety
//!
//! The inner state is wrapped in `Arc<Mutex<InMemoryStoreInner>>`. Every write
//! holds the lock across its precondition check and mutation, which is what
//! makes `create_pending`, `transition_status` and `delete_pending` atomic.
//!
//! [`ConnectionId`]: crate::domain::ConnectionId

mod graph;
mod inner;
mod jsonl;
mod trait_impl;

use crate::domain::{Connection, User};
use inner::InMemoryStoreInner;
use std::sync::Arc;
use tokio::sync::Mutex;

// Re-export public API
pub use jsonl::{fingerprint_files, load_from_jsonl, save_to_jsonl, LoadWarning};

/// Thread-safe in-memory store.
///
/// Cloning is cheap and yields a handle to the same underlying data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<InMemoryStoreInner>>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

impl InMemoryStore {
    /// Create an empty store.
    ///
    /// # Example
    ///
    /// ```
    /// use liaison::storage::in_memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::new();
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records.
    ///
    /// Records that would break the store's invariants (unknown endpoints,
    /// self-connections, a second active connection for a pair, duplicate
    /// IDs) are skipped and reported as warnings. Connections are applied in
    /// creation order, so the earliest active connection for a pair wins.
    #[must_use]
    pub fn from_records(
        users: Vec<User>,
        connections: Vec<Connection>,
    ) -> (Self, Vec<LoadWarning>) {
        let (inner, warnings) = InMemoryStoreInner::from_records(users, connections);
        (
            Self {
                inner: Arc::new(Mutex::new(inner)),
            },
            warnings,
        )
    }

    /// Swap this store's contents for those of `other`.
    pub(crate) async fn replace_with(&self, other: InMemoryStore) {
        let fresh = std::mem::take(&mut *other.inner.lock().await);
        *self.inner.lock().await = fresh;
    }
}
