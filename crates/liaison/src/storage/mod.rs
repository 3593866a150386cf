//! Storage abstraction layer for liaison.
//!
//! This module provides the read/write contract the connection graph needs
//! from its persistence layer, plus a factory for the bundled backends:
//!
//! - **In-memory**: `HashMap` records indexed by a petgraph connection graph
//! - **JSONL**: the in-memory backend persisted to `users.jsonl` and
//!   `connections.jsonl`
//!
//! # Batching
//!
//! Every read that fans out over users takes a slice of IDs. Callers are
//! expected to issue one call per traversal level (or per hydration pass),
//! never one call per node.
//!
//! # Atomicity
//!
//! The three writes ([`NetworkStore::create_pending`],
//! [`NetworkStore::transition_status`], [`NetworkStore::delete_pending`]) each
//! perform their precondition check and their mutation as one unit. Two
//! concurrent requests for the same pair can never both pass the conflict
//! check. The in-memory backend does this by holding its mutex across both
//! steps; a relational backend would use a transaction.
//!
//! # Concurrent processes
//!
//! The JSONL backend assumes a single writer per repository. Each process
//! loads the whole snapshot, mutates it in memory and rewrites both files on
//! `save()`. To avoid silently dropping another process's write, the store
//! remembers a fingerprint of the files it loaded and `save()` fails with
//! `Error::Conflict` if the files changed on disk since then. The check and
//! the rename are not one atomic step, so two saves racing within that
//! window can still lose one of the writes.
//!
//! # Test Utilities
//!
//! [`CountingStore`] wraps any store and counts calls per method. It is
//! available under `cfg(test)` or the `test-util` feature.

use crate::domain::{Connection, ConnectionId, ConnectionStatus, NewConnection, User, UserId};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

// Storage backend implementations
pub mod in_memory;

/// Every record held by a store, used for export and persistence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    /// All users
    pub users: Vec<User>,

    /// All connections, in any status
    pub connections: Vec<Connection>,
}

/// Core storage trait for the connection graph.
///
/// Implementations must be `Send + Sync`; all methods take `&self` and rely on
/// interior mutability so a single store can be shared behind an `Arc`.
///
/// # Method Categories
///
/// - **Users**: `get_user`, `get_users`, `upsert_user`
/// - **Connection reads**: `get_connection`, `accepted_connections_touching`,
///   `pending_connections_for`, `responded_connections_for_addressee`
/// - **Connection writes**: `create_pending`, `transition_status`, `delete_pending`
/// - **Persistence**: `export_all`, `save`, `reload`
#[async_trait]
pub trait NetworkStore: Send + Sync {
    // ========== Users ==========

    /// Get a user by ID. Returns `None` if the user doesn't exist.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Batch-load users. Missing IDs are simply absent from the map.
    async fn get_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>>;

    /// Insert or replace a user record.
    async fn upsert_user(&self, user: User) -> Result<()>;

    // ========== Connection reads ==========

    /// Get a connection by ID. Returns `None` if it doesn't exist.
    async fn get_connection(&self, id: &ConnectionId) -> Result<Option<Connection>>;

    /// All accepted connections with at least one endpoint in `ids`, in either
    /// direction. Each connection appears once, ordered by creation time.
    async fn accepted_connections_touching(&self, ids: &[UserId]) -> Result<Vec<Connection>>;

    /// Pending connections where `id` is requester or addressee.
    async fn pending_connections_for(&self, id: &UserId) -> Result<Vec<Connection>>;

    /// Accepted or rejected connections where `id` was the addressee.
    async fn responded_connections_for_addressee(&self, id: &UserId) -> Result<Vec<Connection>>;

    // ========== Connection writes ==========

    /// Atomically check that no pending or accepted connection joins the pair
    /// (in either direction) and create a new pending one.
    ///
    /// # Errors
    ///
    /// - `Error::Conflict` if an active connection already joins the pair
    async fn create_pending(&self, connection: NewConnection) -> Result<Connection>;

    /// Atomically move a connection from `expected` to `next`.
    ///
    /// Accepting stamps `connected_at` and `last_interacted_at`.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionNotFound` if the connection doesn't exist
    /// - `Error::Conflict` if the current status is not `expected`
    async fn transition_status(
        &self,
        id: &ConnectionId,
        expected: ConnectionStatus,
        next: ConnectionStatus,
    ) -> Result<Connection>;

    /// Atomically delete a connection that is still pending.
    ///
    /// Returns the deleted record.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionNotFound` if the connection doesn't exist
    /// - `Error::Conflict` if it is no longer pending
    async fn delete_pending(&self, id: &ConnectionId) -> Result<Connection>;

    // ========== Persistence ==========

    /// Export every user and connection.
    async fn export_all(&self) -> Result<StoreSnapshot>;

    /// Save changes to persistent storage. No-op for in-memory storage.
    async fn save(&self) -> Result<()>;

    /// Reload state from persistent storage, discarding unsaved changes.
    /// No-op for in-memory storage.
    async fn reload(&self) -> Result<()>;
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// JSONL file storage (persistent)
    Jsonl {
        /// Path to `users.jsonl`
        users: PathBuf,
        /// Path to `connections.jsonl`
        connections: PathBuf,
    },
}

/// In-memory store that writes both JSONL files on `save()`.
struct JsonlBackedStore {
    inner: in_memory::InMemoryStore,
    users_path: PathBuf,
    connections_path: PathBuf,
    /// Fingerprint of the files as last loaded or saved by this store
    on_disk: tokio::sync::Mutex<Vec<u8>>,
}

impl JsonlBackedStore {
    async fn open(users_path: PathBuf, connections_path: PathBuf) -> Result<Self> {
        // Fingerprint first: a write landing mid-load then shows up as a conflict
        let fingerprint = in_memory::fingerprint_files(&users_path, &connections_path).await?;
        let (inner, warnings) = in_memory::load_from_jsonl(&users_path, &connections_path).await?;
        for warning in &warnings {
            // Storage is still usable
            tracing::warn!(warning = ?warning, "JSONL load warning");
        }
        Ok(Self {
            inner,
            users_path,
            connections_path,
            on_disk: tokio::sync::Mutex::new(fingerprint),
        })
    }
}

#[async_trait]
impl NetworkStore for JsonlBackedStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        self.inner.get_user(id).await
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>> {
        self.inner.get_users(ids).await
    }

    async fn upsert_user(&self, user: User) -> Result<()> {
        self.inner.upsert_user(user).await
    }

    async fn get_connection(&self, id: &ConnectionId) -> Result<Option<Connection>> {
        self.inner.get_connection(id).await
    }

    async fn accepted_connections_touching(&self, ids: &[UserId]) -> Result<Vec<Connection>> {
        self.inner.accepted_connections_touching(ids).await
    }

    async fn pending_connections_for(&self, id: &UserId) -> Result<Vec<Connection>> {
        self.inner.pending_connections_for(id).await
    }

    async fn responded_connections_for_addressee(&self, id: &UserId) -> Result<Vec<Connection>> {
        self.inner.responded_connections_for_addressee(id).await
    }

    async fn create_pending(&self, connection: NewConnection) -> Result<Connection> {
        self.inner.create_pending(connection).await
    }

    async fn transition_status(
        &self,
        id: &ConnectionId,
        expected: ConnectionStatus,
        next: ConnectionStatus,
    ) -> Result<Connection> {
        self.inner.transition_status(id, expected, next).await
    }

    async fn delete_pending(&self, id: &ConnectionId) -> Result<Connection> {
        self.inner.delete_pending(id).await
    }

    async fn export_all(&self) -> Result<StoreSnapshot> {
        self.inner.export_all().await
    }

    async fn save(&self) -> Result<()> {
        let mut on_disk = self.on_disk.lock().await;
        let current =
            in_memory::fingerprint_files(&self.users_path, &self.connections_path).await?;
        if current != *on_disk {
            tracing::warn!(
                users = %self.users_path.display(),
                "JSONL files changed on disk since load"
            );
            return Err(Error::Conflict(
                "The repository was modified by another liaison process; re-run the command"
                    .to_string(),
            ));
        }

        in_memory::save_to_jsonl(&self.inner, &self.users_path, &self.connections_path).await?;
        *on_disk = in_memory::fingerprint_files(&self.users_path, &self.connections_path).await?;
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let mut on_disk = self.on_disk.lock().await;
        let fingerprint =
            in_memory::fingerprint_files(&self.users_path, &self.connections_path).await?;
        let (fresh, warnings) =
            in_memory::load_from_jsonl(&self.users_path, &self.connections_path).await?;
        for warning in &warnings {
            tracing::warn!(warning = ?warning, "JSONL reload warning");
        }
        self.inner.replace_with(fresh).await;
        *on_disk = fingerprint;
        Ok(())
    }
}

/// Create a storage instance for the given backend.
///
/// Missing JSONL files are treated as empty (first run).
///
/// # Example
///
/// ```no_run
/// use liaison::storage::{create_storage, StorageBackend};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> anyhow::Result<()> {
///     let store = create_storage(StorageBackend::InMemory).await?;
///     // Use store...
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// - `Error::Io` if the JSONL files exist but cannot be read
pub async fn create_storage(backend: StorageBackend) -> Result<Box<dyn NetworkStore>> {
    match backend {
        StorageBackend::InMemory => Ok(Box::new(in_memory::InMemoryStore::new())),
        StorageBackend::Jsonl { users, connections } => {
            Ok(Box::new(JsonlBackedStore::open(users, connections).await?))
        }
    }
}

// ========== Test Utilities ==========

/// Per-method call counters recorded by [`CountingStore`].
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallCounts {
    /// `get_user` calls
    pub get_user: usize,
    /// `get_users` calls
    pub get_users: usize,
    /// `accepted_connections_touching` calls
    pub accepted_touching: usize,
    /// `pending_connections_for` calls
    pub pending_for: usize,
    /// `responded_connections_for_addressee` calls
    pub responded_for: usize,
}

/// Store wrapper that counts read calls, for asserting batching behaviour.
#[cfg(any(test, feature = "test-util"))]
pub struct CountingStore<S> {
    inner: S,
    counts: std::sync::Mutex<CallCounts>,
}

#[cfg(any(test, feature = "test-util"))]
impl<S: NetworkStore> CountingStore<S> {
    /// Wrap a store.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counts: std::sync::Mutex::new(CallCounts::default()),
        }
    }

    /// Snapshot of the counters.
    ///
    /// # Panics
    ///
    /// Panics if the counter mutex is poisoned.
    pub fn counts(&self) -> CallCounts {
        self.counts.lock().expect("counter mutex poisoned").clone()
    }

    /// Reset every counter to zero.
    ///
    /// # Panics
    ///
    /// Panics if the counter mutex is poisoned.
    pub fn reset(&self) {
        *self.counts.lock().expect("counter mutex poisoned") = CallCounts::default();
    }

    fn bump(&self, f: impl FnOnce(&mut CallCounts)) {
        f(&mut self.counts.lock().expect("counter mutex poisoned"));
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl<S: NetworkStore> NetworkStore for CountingStore<S> {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        self.bump(|c| c.get_user += 1);
        self.inner.get_user(id).await
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>> {
        self.bump(|c| c.get_users += 1);
        self.inner.get_users(ids).await
    }

    async fn upsert_user(&self, user: User) -> Result<()> {
        self.inner.upsert_user(user).await
    }

    async fn get_connection(&self, id: &ConnectionId) -> Result<Option<Connection>> {
        self.inner.get_connection(id).await
    }

    async fn accepted_connections_touching(&self, ids: &[UserId]) -> Result<Vec<Connection>> {
        self.bump(|c| c.accepted_touching += 1);
        self.inner.accepted_connections_touching(ids).await
    }

    async fn pending_connections_for(&self, id: &UserId) -> Result<Vec<Connection>> {
        self.bump(|c| c.pending_for += 1);
        self.inner.pending_connections_for(id).await
    }

    async fn responded_connections_for_addressee(&self, id: &UserId) -> Result<Vec<Connection>> {
        self.bump(|c| c.responded_for += 1);
        self.inner.responded_connections_for_addressee(id).await
    }

    async fn create_pending(&self, connection: NewConnection) -> Result<Connection> {
        self.inner.create_pending(connection).await
    }

    async fn transition_status(
        &self,
        id: &ConnectionId,
        expected: ConnectionStatus,
        next: ConnectionStatus,
    ) -> Result<Connection> {
        self.inner.transition_status(id, expected, next).await
    }

    async fn delete_pending(&self, id: &ConnectionId) -> Result<Connection> {
        self.inner.delete_pending(id).await
    }

    async fn export_all(&self) -> Result<StoreSnapshot> {
        self.inner.export_all().await
    }

    async fn save(&self) -> Result<()> {
        self.inner.save().await
    }

    async fn reload(&self) -> Result<()> {
        self.inner.reload().await
    }
}
