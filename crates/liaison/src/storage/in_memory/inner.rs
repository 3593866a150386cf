//! Core in-memory storage data structures.
//!
//! This module contains the inner storage structure that holds all data
//! and is wrapped in `Arc<Mutex<>>` for thread safety.

use super::graph::active_between;
use super::jsonl::LoadWarning;
use crate::domain::{Connection, ConnectionId, User, UserId};
use crate::id_generation::ConnectionIdGenerator;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use std::collections::HashMap;

/// Inner storage structure (not thread-safe).
///
/// # Invariants
///
/// - Every connection in `connections` has an edge in `graph` and an entry in
///   `edge_map`, and both endpoints have entries in `node_map`.
/// - At most one pending or accepted connection joins any unordered pair.
pub(crate) struct InMemoryStoreInner {
    /// Users indexed by ID
    pub(super) users: HashMap<UserId, User>,

    /// Connections indexed by ID
    pub(super) connections: HashMap<ConnectionId, Connection>,

    /// Adjacency index. Nodes hold user IDs, edges hold connection IDs.
    /// Edge direction: requester -> addressee.
    pub(super) graph: StableDiGraph<UserId, ConnectionId>,

    /// Mapping from user ID to graph node
    pub(super) node_map: HashMap<UserId, NodeIndex>,

    /// Mapping from connection ID to graph edge
    pub(super) edge_map: HashMap<ConnectionId, EdgeIndex>,

    /// ID generator for new connections
    pub(super) id_generator: ConnectionIdGenerator,
}

impl Default for InMemoryStoreInner {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStoreInner {
    /// Create a new empty storage instance
    pub(crate) fn new() -> Self {
        Self {
            users: HashMap::new(),
            connections: HashMap::new(),
            graph: StableDiGraph::new(),
            node_map: HashMap::new(),
            edge_map: HashMap::new(),
            id_generator: ConnectionIdGenerator::new(0),
        }
    }

    /// Build storage from raw records, skipping anything that violates an
    /// invariant.
    pub(crate) fn from_records(
        users: Vec<User>,
        mut connections: Vec<Connection>,
    ) -> (Self, Vec<LoadWarning>) {
        let mut inner = Self::new();
        let mut warnings = Vec::new();

        for user in users {
            if inner.users.contains_key(&user.id) {
                warnings.push(LoadWarning::DuplicateUser { user_id: user.id });
                continue;
            }
            inner.upsert_user(user);
        }

        // Earliest record wins when two active connections join the same pair
        connections.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        for connection in connections {
            if inner.connections.contains_key(&connection.id) {
                warnings.push(LoadWarning::DuplicateConnectionId {
                    connection_id: connection.id,
                });
                continue;
            }

            if connection.requester_id == connection.addressee_id {
                warnings.push(LoadWarning::SelfConnection {
                    connection_id: connection.id,
                });
                continue;
            }

            let missing = [&connection.requester_id, &connection.addressee_id]
                .into_iter()
                .find(|id| !inner.users.contains_key(*id))
                .cloned();
            if let Some(missing_user) = missing {
                warnings.push(LoadWarning::OrphanedConnection {
                    connection_id: connection.id,
                    missing_user,
                });
                continue;
            }

            if connection.status.is_active() {
                if let Some(existing) = active_between(
                    &inner,
                    &connection.requester_id,
                    &connection.addressee_id,
                ) {
                    warnings.push(LoadWarning::DuplicateActivePair {
                        connection_id: connection.id,
                        existing: existing.id.clone(),
                    });
                    continue;
                }
            }

            inner.id_generator.register_id(&connection.id);
            inner.insert_connection(connection);
        }

        (inner, warnings)
    }

    /// Get or create the graph node for a user.
    pub(super) fn node_for(&mut self, id: &UserId) -> NodeIndex {
        if let Some(&node) = self.node_map.get(id) {
            return node;
        }
        let node = self.graph.add_node(id.clone());
        self.node_map.insert(id.clone(), node);
        node
    }

    /// Insert or replace a user, making sure it has a graph node.
    pub(super) fn upsert_user(&mut self, user: User) {
        self.node_for(&user.id);
        self.users.insert(user.id.clone(), user);
    }

    /// Store a connection and index it in the graph.
    ///
    /// Callers are responsible for the uniqueness checks.
    pub(super) fn insert_connection(&mut self, connection: Connection) {
        let from = self.node_for(&connection.requester_id);
        let to = self.node_for(&connection.addressee_id);
        let edge = self.graph.add_edge(from, to, connection.id.clone());
        self.edge_map.insert(connection.id.clone(), edge);
        self.connections.insert(connection.id.clone(), connection);
    }

    /// Remove a connection and its graph edge.
    pub(super) fn remove_connection(&mut self, id: &ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(id)?;
        if let Some(edge) = self.edge_map.remove(id) {
            self.graph.remove_edge(edge);
        }
        self.id_generator.release_id(id);
        Some(connection)
    }
}
