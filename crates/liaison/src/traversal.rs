//! Bounded breadth-first traversal of the accepted-connection graph.
//!
//! Starting from an origin user, the walk expands one degree at a time up to
//! [`MAX_DEGREE`]. Each level issues exactly one batched read for the
//! accepted connections touching the whole frontier.
//!
//! # Placement rules
//!
//! - The origin never appears in any bucket.
//! - A user is placed in the bucket of the lowest degree at which it is
//!   discovered and is never revisited afterwards.
//! - Within a degree, the connector set of a user accumulates every frontier
//!   member that reaches it, while its path is fixed by the first edge that
//!   discovered it.
//! - `connected_at` keeps the earliest timestamp seen, `last_interaction_at`
//!   the latest; `relationship_tag` and `notes` keep the first value seen.

use crate::domain::{Connection, UserId};
use crate::error::Result;
use crate::storage::NetworkStore;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// Deepest degree the traversal reports.
pub const MAX_DEGREE: usize = 3;

/// Metadata accumulated for one reachable user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DegreeEntry {
    /// Frontier members with a direct accepted connection to this user
    pub connectors: BTreeSet<UserId>,

    /// First-discovered path from the origin, inclusive of both ends
    pub path: Vec<UserId>,

    /// Earliest `connected_at` across the discovering edges
    pub connected_at: Option<DateTime<Utc>>,

    /// Latest `last_interacted_at` across the discovering edges
    pub last_interaction_at: Option<DateTime<Utc>>,

    /// First relationship tag seen
    pub relationship_tag: Option<String>,

    /// First notes seen
    pub notes: Option<String>,
}

impl DegreeEntry {
    fn absorb(
        &mut self,
        source: &UserId,
        source_path: &[UserId],
        target: &UserId,
        edge: &Connection,
    ) {
        self.connectors.insert(source.clone());

        if self.path.is_empty() {
            self.path = source_path.to_vec();
            self.path.push(target.clone());
        }

        self.connected_at = match (self.connected_at, edge.connected_at) {
            (Some(current), Some(seen)) => Some(current.min(seen)),
            (current, seen) => current.or(seen),
        };
        self.last_interaction_at = match (self.last_interaction_at, edge.last_interacted_at) {
            (Some(current), Some(seen)) => Some(current.max(seen)),
            (current, seen) => current.or(seen),
        };

        if self.relationship_tag.is_none() {
            self.relationship_tag.clone_from(&edge.relationship_tag);
        }
        if self.notes.is_none() {
            self.notes.clone_from(&edge.notes);
        }
    }
}

/// Reachable users at one degree, keyed by user ID.
pub type DegreeBucket = BTreeMap<UserId, DegreeEntry>;

/// Result of a traversal: one bucket per degree.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    origin: UserId,
    buckets: Vec<DegreeBucket>,
}

impl Traversal {
    /// The user the walk started from.
    #[must_use]
    pub fn origin(&self) -> &UserId {
        &self.origin
    }

    /// Bucket for `degree` (1-based). Degrees outside `1..=MAX_DEGREE` are empty.
    #[must_use]
    pub fn degree(&self, degree: usize) -> &DegreeBucket {
        static EMPTY: DegreeBucket = BTreeMap::new();
        degree
            .checked_sub(1)
            .and_then(|index| self.buckets.get(index))
            .unwrap_or(&EMPTY)
    }

    /// Iterate `(degree, bucket)` pairs in ascending degree order.
    pub fn buckets(&self) -> impl Iterator<Item = (usize, &DegreeBucket)> {
        self.buckets
            .iter()
            .enumerate()
            .map(|(index, bucket)| (index + 1, bucket))
    }

    /// Users directly connected to the origin.
    #[must_use]
    pub fn first_degree_ids(&self) -> BTreeSet<UserId> {
        self.degree(1).keys().cloned().collect()
    }

    /// Total reachable users across all degrees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(BTreeMap::len).sum()
    }

    /// Returns `true` if nothing is reachable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every user ID referenced anywhere in the result: the origin, bucket
    /// members, connectors and path nodes.
    #[must_use]
    pub fn referenced_ids(&self) -> BTreeSet<UserId> {
        let mut ids = BTreeSet::from([self.origin.clone()]);
        for bucket in &self.buckets {
            for (id, entry) in bucket {
                ids.insert(id.clone());
                ids.extend(entry.connectors.iter().cloned());
                ids.extend(entry.path.iter().cloned());
            }
        }
        ids
    }
}

/// Walk the accepted-connection graph from `origin` up to [`MAX_DEGREE`].
///
/// # Errors
///
/// Propagates storage failures from the batched edge reads.
pub async fn traverse(store: &dyn NetworkStore, origin: &UserId) -> Result<Traversal> {
    let mut visited: HashSet<UserId> = HashSet::from([origin.clone()]);
    let mut frontier: BTreeMap<UserId, Vec<UserId>> =
        BTreeMap::from([(origin.clone(), vec![origin.clone()])]);
    let mut buckets = Vec::with_capacity(MAX_DEGREE);

    for degree in 1..=MAX_DEGREE {
        if frontier.is_empty() {
            break;
        }

        let frontier_ids: Vec<UserId> = frontier.keys().cloned().collect();
        let edges = store.accepted_connections_touching(&frontier_ids).await?;

        let bucket = expand(&frontier, &visited, &edges);
        debug!(
            degree,
            frontier = frontier.len(),
            edges = edges.len(),
            reached = bucket.len(),
            "Expanded traversal level"
        );

        frontier = bucket
            .iter()
            .filter(|(id, _)| visited.insert((*id).clone()))
            .map(|(id, entry)| (id.clone(), entry.path.clone()))
            .collect();

        buckets.push(bucket);
    }

    buckets.resize_with(MAX_DEGREE, BTreeMap::new);

    Ok(Traversal {
        origin: origin.clone(),
        buckets,
    })
}

/// Expand one level: merge every edge leaving the frontier toward an
/// unvisited user into a fresh bucket.
fn expand(
    frontier: &BTreeMap<UserId, Vec<UserId>>,
    visited: &HashSet<UserId>,
    edges: &[Connection],
) -> DegreeBucket {
    let mut bucket = DegreeBucket::new();

    for edge in edges {
        let directions = [
            (&edge.requester_id, &edge.addressee_id),
            (&edge.addressee_id, &edge.requester_id),
        ];

        for (source, target) in directions {
            let Some(source_path) = frontier.get(source) else {
                continue;
            };
            if visited.contains(target) {
                continue;
            }

            bucket
                .entry(target.clone())
                .or_default()
                .absorb(source, source_path, target, edge);
        }
    }

    bucket
}
