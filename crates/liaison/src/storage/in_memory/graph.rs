//! Adjacency queries over the petgraph connection index.
//!
//! The graph is directed requester -> addressee; every query here treats it
//! as undirected by walking both edge directions.

use super::inner::InMemoryStoreInner;
use crate::domain::{Connection, ConnectionStatus, UserId};
use petgraph::Direction;
use std::collections::HashSet;

/// Every connection (any status) with `user` as an endpoint.
pub(super) fn connections_of<'a>(
    inner: &'a InMemoryStoreInner,
    user: &UserId,
) -> impl Iterator<Item = &'a Connection> + use<'a> {
    let node = inner.node_map.get(user).copied();

    node.into_iter().flat_map(move |node| {
        inner
            .graph
            .edges_directed(node, Direction::Outgoing)
            .chain(inner.graph.edges_directed(node, Direction::Incoming))
            .filter_map(move |edge| inner.connections.get(edge.weight()))
    })
}

/// The pending or accepted connection joining `a` and `b`, if any.
pub(super) fn active_between<'a>(
    inner: &'a InMemoryStoreInner,
    a: &UserId,
    b: &UserId,
) -> Option<&'a Connection> {
    connections_of(inner, a).find(|connection| {
        connection.status.is_active() && connection.joins(a, b)
    })
}

/// Accepted connections touching any of `users`, each reported once and
/// ordered by creation time then ID.
pub(super) fn accepted_touching(inner: &InMemoryStoreInner, users: &[UserId]) -> Vec<Connection> {
    let mut seen = HashSet::new();
    let mut result: Vec<Connection> = users
        .iter()
        .flat_map(|user| connections_of(inner, user))
        .filter(|connection| connection.status == ConnectionStatus::Accepted)
        .filter(|connection| seen.insert(connection.id.clone()))
        .cloned()
        .collect();

    result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    result
}
