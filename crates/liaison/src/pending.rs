//! Pending invitations with mutual-connector context.

use crate::domain::{Connection, ConnectionId, ConnectionStatus, UserId};
use crate::error::Result;
use crate::hydrate::NodeSummary;
use crate::storage::NetworkStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Whether the origin received or sent the invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationDirection {
    /// Origin is the addressee
    Incoming,
    /// Origin is the requester
    Outgoing,
}

/// One pending invitation, seen from the origin's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInvitation {
    /// The other party
    #[serde(flatten)]
    pub counterpart: NodeSummary,

    /// Connection record ID
    pub connection_id: ConnectionId,

    /// Incoming or outgoing
    pub direction: InvitationDirection,

    /// Display name of whoever sent the invitation
    pub inviter_name: String,

    /// Note attached to the request
    pub note: Option<String>,

    /// Relationship tag attached to the request
    pub relationship_tag: Option<String>,

    /// When the request was created
    pub sent_at: DateTime<Utc>,

    /// Always `pending`
    pub status: ConnectionStatus,

    /// Counterpart connections that are also first-degree connections of the origin
    pub mutual_connections: usize,
}

/// Pending invitations split by direction, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingInvitations {
    /// Invitations the origin received
    pub incoming: Vec<PendingInvitation>,

    /// Invitations the origin sent
    pub outgoing: Vec<PendingInvitation>,
}

impl PendingInvitations {
    /// Total invitations in both directions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.incoming.len() + self.outgoing.len()
    }

    /// Returns `true` if there are no invitations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counterparts of `origin` in `pending`, de-duplicated.
#[must_use]
pub fn counterpart_ids(origin: &UserId, pending: &[Connection]) -> BTreeSet<UserId> {
    pending
        .iter()
        .filter_map(|connection| connection.counterpart(origin))
        .cloned()
        .collect()
}

/// Resolve pending connections into invitations.
///
/// `summaries` must hold the origin and every resolvable counterpart;
/// invitations whose counterpart is missing from it are dropped. Mutual
/// counts come from a single batched read of the counterparts' accepted
/// connections, intersected with `first_degree`.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn resolve(
    store: &dyn NetworkStore,
    origin: &UserId,
    pending: &[Connection],
    first_degree: &BTreeSet<UserId>,
    summaries: &HashMap<UserId, NodeSummary>,
) -> Result<PendingInvitations> {
    let counterparts: Vec<UserId> = counterpart_ids(origin, pending)
        .into_iter()
        .filter(|id| summaries.contains_key(id))
        .collect();

    let mutuals = if counterparts.is_empty() {
        HashMap::new()
    } else {
        let edges = store.accepted_connections_touching(&counterparts).await?;
        mutual_counts(&counterparts, &edges, first_degree)
    };

    let mut invitations = PendingInvitations::default();

    for connection in pending {
        if connection.status != ConnectionStatus::Pending {
            continue;
        }
        let Some(counterpart_id) = connection.counterpart(origin) else {
            continue;
        };
        let Some(counterpart) = summaries.get(counterpart_id) else {
            debug!(
                connection_id = %connection.id,
                counterpart = %counterpart_id,
                "Dropping unresolvable invitation"
            );
            continue;
        };

        let direction = if &connection.addressee_id == origin {
            InvitationDirection::Incoming
        } else {
            InvitationDirection::Outgoing
        };

        let inviter_name = summaries
            .get(&connection.requester_id)
            .map_or_else(|| connection.requester_id.to_string(), |s| s.name.clone());

        let invitation = PendingInvitation {
            counterpart: counterpart.clone(),
            connection_id: connection.id.clone(),
            direction,
            inviter_name,
            note: connection.notes.clone(),
            relationship_tag: connection.relationship_tag.clone(),
            sent_at: connection.created_at,
            status: connection.status,
            mutual_connections: mutuals.get(counterpart_id).copied().unwrap_or(0),
        };

        match direction {
            InvitationDirection::Incoming => invitations.incoming.push(invitation),
            InvitationDirection::Outgoing => invitations.outgoing.push(invitation),
        }
    }

    for list in [&mut invitations.incoming, &mut invitations.outgoing] {
        list.sort_by(|a, b| {
            b.sent_at
                .cmp(&a.sent_at)
                .then_with(|| a.connection_id.cmp(&b.connection_id))
        });
    }

    Ok(invitations)
}

fn mutual_counts(
    counterparts: &[UserId],
    edges: &[Connection],
    first_degree: &BTreeSet<UserId>,
) -> HashMap<UserId, usize> {
    let mut neighbours: HashMap<&UserId, BTreeSet<&UserId>> = HashMap::new();
    for edge in edges {
        for (from, to) in [
            (&edge.requester_id, &edge.addressee_id),
            (&edge.addressee_id, &edge.requester_id),
        ] {
            neighbours.entry(from).or_default().insert(to);
        }
    }

    counterparts
        .iter()
        .map(|id| {
            let count = neighbours
                .get(id)
                .map_or(0, |set| set.iter().filter(|n| first_degree.contains(**n)).count());
            (id.clone(), count)
        })
        .collect()
}
