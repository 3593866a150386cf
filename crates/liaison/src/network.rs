//! The connection network read model.
//!
//! [`NetworkService::build_connection_network`] composes the traversal,
//! hydration, pending-invitation and analytics passes into a single
//! [`NetworkPayload`]. Store traffic is bounded: one accepted-edge read per
//! degree, one user batch, and at most one read each for pending invitations
//! and their mutual counts, plus one for analytics.

use crate::analytics::{self, InvitationAnalytics};
use crate::domain::{Role, User, UserId};
use crate::error::{AuthorizationError, Error, Result};
use crate::hydrate::{self, NodeSummary, UNKNOWN_MEMBER};
use crate::pending::{self, PendingInvitations};
use crate::policy::PolicyMatrix;
use crate::storage::NetworkStore;
use crate::traversal::{self, DegreeEntry, Traversal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Number of suggested connections returned when not configured.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

/// Full network view of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPayload {
    /// Owner of the network
    pub subject: NodeSummary,

    /// User looking at it
    pub viewer: NodeSummary,

    /// Policy as it applies to the subject
    pub policy: PolicySnapshot,

    /// Node counts per degree
    pub summary: NetworkSummary,

    /// Direct connections, sorted by name
    pub first_degree: Vec<NetworkNode>,

    /// Connections of connections, sorted by name
    pub second_degree: Vec<NetworkNode>,

    /// Third-degree nodes, sorted by name
    pub third_degree: Vec<NetworkNode>,

    /// Pending invitations, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingInvitations>,

    /// Second-degree nodes with the most mutual connections
    pub suggested_connections: Vec<NetworkNode>,

    /// Response statistics for invitations the subject received
    pub invitation_analytics: InvitationAnalytics,

    /// When the payload was built
    pub generated_at: DateTime<Utc>,
}

/// Connection policy from the subject's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySnapshot {
    /// Role the actions are evaluated for
    pub actor_role: Role,

    /// Roles the actor may connect with (one-sided)
    pub allowed_roles: Vec<Role>,

    /// The whole matrix
    pub matrix: BTreeMap<Role, Vec<Role>>,
}

/// Node counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    /// First-degree count
    pub first_degree: usize,
    /// Second-degree count
    pub second_degree: usize,
    /// Third-degree count
    pub third_degree: usize,
    /// Sum of the three
    pub total: usize,
}

/// One reachable user with its relationship to the subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNode {
    /// Hydrated user summary
    #[serde(flatten)]
    pub summary: NodeSummary,

    /// Hops from the subject
    pub degree: usize,

    /// "1st degree", "2nd degree", ...
    pub degree_label: String,

    /// Connectors other than the subject
    pub mutual_connections: usize,

    /// Users through which this node was reached, sorted by name
    pub connectors: Vec<ConnectorRef>,

    /// Path from the subject to this node
    pub path: Vec<PathStep>,

    /// Relationship metadata merged from the discovering edges
    pub metadata: NodeMetadata,

    /// What the subject can do with this node
    pub actions: NodeActions,
}

/// A connector reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorRef {
    /// User ID
    pub id: UserId,
    /// Display name
    pub name: String,
}

/// One hop of an introduction path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// User ID
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Role, when the user could be loaded
    pub role: Option<Role>,
}

/// Edge metadata for a network node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// Earliest connection time
    pub connected_at: Option<DateTime<Utc>>,
    /// Latest interaction time
    pub last_interaction_at: Option<DateTime<Utc>>,
    /// Relationship tag
    pub relationship_tag: Option<String>,
    /// Notes
    pub notes: Option<String>,
}

/// Action flags for a network node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeActions {
    /// Direct messaging is open (first degree only)
    pub can_message: bool,
    /// A connection request is allowed
    pub can_request_connection: bool,
    /// Reaching this node needs an introduction
    pub requires_introduction: bool,
    /// Why a request is blocked, if it is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `1` -> "1st degree", `2` -> "2nd degree", `3` -> "3rd degree", else "N°".
#[must_use]
pub fn degree_label(degree: usize) -> String {
    match degree {
        1 => "1st degree".to_string(),
        2 => "2nd degree".to_string(),
        3 => "3rd degree".to_string(),
        n => format!("{n}°"),
    }
}

/// Builds [`NetworkPayload`]s over a shared store.
#[derive(Clone)]
pub struct NetworkService {
    store: Arc<dyn NetworkStore>,
    policy: Arc<PolicyMatrix>,
    suggestion_limit: usize,
}

impl NetworkService {
    /// Service with the default suggestion limit.
    pub fn new(store: Arc<dyn NetworkStore>, policy: Arc<PolicyMatrix>) -> Self {
        Self {
            store,
            policy,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }

    /// Override the number of suggested connections.
    #[must_use]
    pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = limit;
        self
    }

    /// Build the network of `subject_id` as seen by `viewer_id`.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if either ID is blank
    /// - `Error::UserNotFound` if the subject or viewer does not exist
    /// - `Error::Authorization` unless the viewer is the subject or an admin
    /// - storage failures
    pub async fn build_connection_network(
        &self,
        subject_id: &UserId,
        viewer_id: &UserId,
        include_pending: bool,
    ) -> Result<NetworkPayload> {
        if subject_id.is_blank() || viewer_id.is_blank() {
            return Err(Error::Validation(
                "Subject and viewer user IDs are required".to_string(),
            ));
        }

        let subject = self.load_user(subject_id).await?;
        let viewer = if viewer_id == subject_id {
            subject.clone()
        } else {
            self.load_user(viewer_id).await?
        };

        if viewer.id != subject.id && viewer.role != Role::Admin {
            return Err(AuthorizationError::ViewNetwork {
                viewer: viewer.id.clone(),
                subject: subject.id.clone(),
            }
            .into());
        }

        let traversal = traversal::traverse(self.store.as_ref(), &subject.id).await?;

        let pending_edges = if include_pending {
            Some(self.store.pending_connections_for(&subject.id).await?)
        } else {
            None
        };

        let mut ids = traversal.referenced_ids();
        if let Some(edges) = &pending_edges {
            ids.extend(pending::counterpart_ids(&subject.id, edges));
        }
        ids.remove(&subject.id);
        ids.remove(&viewer.id);

        let mut summaries = hydrate::hydrate(self.store.as_ref(), &ids).await?;
        summaries.insert(subject.id.clone(), hydrate::summarize(&subject));
        summaries.insert(viewer.id.clone(), hydrate::summarize(&viewer));

        let pending = match &pending_edges {
            Some(edges) => Some(
                pending::resolve(
                    self.store.as_ref(),
                    &subject.id,
                    edges,
                    &traversal.first_degree_ids(),
                    &summaries,
                )
                .await?,
            ),
            None => None,
        };

        let responded = self
            .store
            .responded_connections_for_addressee(&subject.id)
            .await?;
        let invitation_analytics = analytics::compute(&responded);

        let assembler = Assembler {
            subject: &subject,
            policy: &self.policy,
            summaries: &summaries,
        };
        let [first_degree, second_degree, third_degree] =
            [1, 2, 3].map(|degree| assembler.nodes(&traversal, degree));

        let suggested_connections = suggestions(&second_degree, self.suggestion_limit);

        let summary = NetworkSummary {
            first_degree: first_degree.len(),
            second_degree: second_degree.len(),
            third_degree: third_degree.len(),
            total: first_degree.len() + second_degree.len() + third_degree.len(),
        };

        debug!(
            subject = %subject.id,
            viewer = %viewer.id,
            total = summary.total,
            hydrated = summaries.len(),
            "Built connection network"
        );

        Ok(NetworkPayload {
            policy: PolicySnapshot {
                actor_role: subject.role,
                allowed_roles: self.policy.allowed(subject.role).into_iter().collect(),
                matrix: self.policy.snapshot(),
            },
            subject: hydrate::summarize(&subject),
            viewer: hydrate::summarize(&viewer),
            summary,
            first_degree,
            second_degree,
            third_degree,
            pending,
            suggested_connections,
            invitation_analytics,
            generated_at: Utc::now(),
        })
    }

    async fn load_user(&self, id: &UserId) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| Error::UserNotFound(id.clone()))
    }
}

/// Turns traversal buckets into presentation nodes.
struct Assembler<'a> {
    subject: &'a User,
    policy: &'a PolicyMatrix,
    summaries: &'a HashMap<UserId, NodeSummary>,
}

impl Assembler<'_> {
    fn nodes(&self, traversal: &Traversal, degree: usize) -> Vec<NetworkNode> {
        let mut nodes: Vec<NetworkNode> = traversal
            .degree(degree)
            .iter()
            .filter_map(|(id, entry)| self.node(id, entry, degree))
            .collect();

        nodes.sort_by(|a, b| {
            a.summary
                .name
                .to_lowercase()
                .cmp(&b.summary.name.to_lowercase())
                .then_with(|| a.summary.id.cmp(&b.summary.id))
        });
        nodes
    }

    /// `None` when the user record is gone.
    fn node(&self, id: &UserId, entry: &DegreeEntry, degree: usize) -> Option<NetworkNode> {
        let summary = self.summaries.get(id)?.clone();

        let mutual_connections = entry.connectors.len()
            - usize::from(entry.connectors.contains(&self.subject.id));

        let mut connectors: Vec<ConnectorRef> = entry
            .connectors
            .iter()
            .map(|connector| ConnectorRef {
                id: connector.clone(),
                name: self.name_of(connector),
            })
            .collect();
        connectors.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });

        let path = entry
            .path
            .iter()
            .map(|step| {
                let found = self.summaries.get(step);
                PathStep {
                    id: step.clone(),
                    name: found.map_or_else(|| UNKNOWN_MEMBER.to_string(), |s| s.name.clone()),
                    role: found.map(|s| s.role),
                }
            })
            .collect();

        let allowed = self.policy.is_allowed(self.subject.role, summary.role);
        let actions = NodeActions {
            can_message: degree == 1,
            can_request_connection: degree > 1 && allowed,
            requires_introduction: degree > 1,
            reason: (!allowed).then(|| {
                AuthorizationError::RoleNotPermitted {
                    requester_role: self.subject.role,
                    target_role: summary.role,
                }
                .to_string()
            }),
        };

        Some(NetworkNode {
            degree,
            degree_label: degree_label(degree),
            mutual_connections,
            connectors,
            path,
            metadata: NodeMetadata {
                connected_at: entry.connected_at,
                last_interaction_at: entry.last_interaction_at,
                relationship_tag: entry.relationship_tag.clone(),
                notes: entry.notes.clone(),
            },
            actions,
            summary,
        })
    }

    fn name_of(&self, id: &UserId) -> String {
        self.summaries
            .get(id)
            .map_or_else(|| UNKNOWN_MEMBER.to_string(), |s| s.name.clone())
    }
}

/// Top `limit` nodes by descending mutual count. Ties keep name order.
fn suggestions(second_degree: &[NetworkNode], limit: usize) -> Vec<NetworkNode> {
    let mut ranked = second_degree.to_vec();
    ranked.sort_by(|a, b| b.mutual_connections.cmp(&a.mutual_connections));
    ranked.truncate(limit);
    ranked
}
