//! Request, respond and withdraw transitions on a single connection.
//!
//! ```text
//! none --request--> pending --accept--> accepted
//!                      |  \--reject--> rejected
//!                      \----withdraw--> (deleted)
//! ```
//!
//! Every successful transition notifies the [`SuggestionCache`]. Cache
//! failures are logged and never fail the transition.

use crate::domain::{
    Connection, ConnectionId, ConnectionReceipt, ConnectionStatus, Decision, MAX_NOTE_LENGTH,
    MAX_TAG_LENGTH, NewConnection, ReceiptStatus, User, UserId,
};
use crate::error::{AuthorizationError, Error, Result};
use crate::policy::PolicyMatrix;
use crate::storage::NetworkStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// External recommendation cache notified after every successful transition.
#[async_trait]
pub trait SuggestionCache: Send + Sync {
    /// Drop cached suggestions involving either user.
    async fn invalidate_suggestions(&self, a: &UserId, b: &UserId) -> anyhow::Result<()>;
}

/// Cache that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSuggestionCache;

#[async_trait]
impl SuggestionCache for NoopSuggestionCache {
    async fn invalidate_suggestions(&self, _a: &UserId, _b: &UserId) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Input for [`ConnectionLifecycle::request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRequest {
    /// User sending the request
    pub requester_id: UserId,

    /// User receiving it
    pub target_id: UserId,

    /// Optional note to the target
    pub note: Option<String>,

    /// Optional relationship label
    pub relationship_tag: Option<String>,
}

impl ConnectionRequest {
    /// Request with no note or tag.
    pub fn new(requester_id: impl Into<UserId>, target_id: impl Into<UserId>) -> Self {
        Self {
            requester_id: requester_id.into(),
            target_id: target_id.into(),
            note: None,
            relationship_tag: None,
        }
    }

    /// Attach a note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attach a relationship tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.relationship_tag = Some(tag.into());
        self
    }

    fn validate(self) -> Result<NewConnection> {
        let requester_id = UserId::new(self.requester_id.as_str().trim());
        let addressee_id = UserId::new(self.target_id.as_str().trim());

        if requester_id.is_blank() || addressee_id.is_blank() {
            return Err(Error::Validation(
                "Both requester and target user IDs are required".to_string(),
            ));
        }
        if requester_id == addressee_id {
            return Err(Error::Validation(
                "You cannot send a connection request to yourself".to_string(),
            ));
        }

        Ok(NewConnection {
            requester_id,
            addressee_id,
            relationship_tag: optional_text(
                self.relationship_tag,
                "Relationship tag",
                MAX_TAG_LENGTH,
            )?,
            notes: optional_text(self.note, "Note", MAX_NOTE_LENGTH)?,
        })
    }
}

/// Trim; blank becomes `None`; enforce `max` characters.
fn optional_text(value: Option<String>, field: &str, max: usize) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max {
        return Err(Error::Validation(format!(
            "{field} cannot exceed {max} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// Connection state machine over a shared store.
#[derive(Clone)]
pub struct ConnectionLifecycle {
    store: Arc<dyn NetworkStore>,
    policy: Arc<PolicyMatrix>,
    cache: Arc<dyn SuggestionCache>,
}

impl ConnectionLifecycle {
    /// Lifecycle with a no-op suggestion cache.
    pub fn new(store: Arc<dyn NetworkStore>, policy: Arc<PolicyMatrix>) -> Self {
        Self {
            store,
            policy,
            cache: Arc::new(NoopSuggestionCache),
        }
    }

    /// Replace the suggestion cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn SuggestionCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Send a connection request.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` for blank IDs, a self-request or an oversized note/tag
    /// - `Error::UserNotFound` if either user does not exist
    /// - `Error::Authorization` if the role policy forbids the pair
    /// - `Error::Conflict` if a pending or accepted connection already joins the pair
    pub async fn request(&self, request: ConnectionRequest) -> Result<Connection> {
        let new_connection = request.validate()?;

        let requester = self.load_user(&new_connection.requester_id).await?;
        let target = self.load_user(&new_connection.addressee_id).await?;

        if !self.policy.is_allowed(requester.role, target.role) {
            return Err(AuthorizationError::RoleNotPermitted {
                requester_role: requester.role,
                target_role: target.role,
            }
            .into());
        }

        let connection = self.store.create_pending(new_connection).await?;
        info!(
            connection_id = %connection.id,
            requester = %connection.requester_id,
            addressee = %connection.addressee_id,
            "Connection requested"
        );

        self.invalidate(&connection).await;
        Ok(connection)
    }

    /// Accept, reject or withdraw a connection.
    ///
    /// Accepting an already accepted connection returns its current state
    /// without a second transition.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionNotFound` if the connection does not exist
    /// - `Error::Authorization` if `actor` is not the addressee (or, for
    ///   withdraw, the requester)
    /// - `Error::Conflict` if the connection is not pending
    pub async fn respond(
        &self,
        connection_id: &ConnectionId,
        actor: &UserId,
        decision: Decision,
    ) -> Result<ConnectionReceipt> {
        let next = match decision {
            Decision::Withdraw => return self.withdraw(connection_id, actor).await,
            Decision::Accept => ConnectionStatus::Accepted,
            Decision::Reject => ConnectionStatus::Rejected,
        };

        let connection = self.load_connection(connection_id).await?;

        if &connection.addressee_id != actor {
            return Err(AuthorizationError::Respond {
                connection: connection_id.clone(),
                actor: actor.clone(),
            }
            .into());
        }

        match connection.status {
            ConnectionStatus::Pending => {}
            ConnectionStatus::Accepted if next == ConnectionStatus::Accepted => {
                return Ok(receipt(&connection));
            }
            status => {
                return Err(Error::Conflict(format!(
                    "Connection {connection_id} has already been {status}"
                )));
            }
        }

        let updated = match self
            .store
            .transition_status(connection_id, ConnectionStatus::Pending, next)
            .await
        {
            Ok(updated) => updated,
            Err(Error::Conflict(message)) => {
                // Lost a race; a concurrent accept still counts as idempotent
                let current = self.load_connection(connection_id).await?;
                if current.status == ConnectionStatus::Accepted && next == ConnectionStatus::Accepted
                {
                    return Ok(receipt(&current));
                }
                return Err(Error::Conflict(message));
            }
            Err(e) => return Err(e),
        };

        info!(
            connection_id = %updated.id,
            actor = %actor,
            status = %updated.status,
            "Connection response recorded"
        );

        self.invalidate(&updated).await;
        Ok(receipt(&updated))
    }

    /// Withdraw a pending request. The record is deleted.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionNotFound` if the connection does not exist
    /// - `Error::Authorization` if `actor` is not the requester
    /// - `Error::Conflict` if the connection is no longer pending
    pub async fn withdraw(
        &self,
        connection_id: &ConnectionId,
        actor: &UserId,
    ) -> Result<ConnectionReceipt> {
        let connection = self.load_connection(connection_id).await?;

        if &connection.requester_id != actor {
            return Err(AuthorizationError::Withdraw {
                connection: connection_id.clone(),
                actor: actor.clone(),
            }
            .into());
        }

        if connection.status != ConnectionStatus::Pending {
            return Err(Error::Conflict(format!(
                "Connection {connection_id} is {}; only pending requests can be withdrawn",
                connection.status
            )));
        }

        let deleted = self.store.delete_pending(connection_id).await?;
        info!(connection_id = %deleted.id, actor = %actor, "Connection request withdrawn");

        self.invalidate(&deleted).await;
        Ok(ConnectionReceipt {
            id: deleted.id,
            status: ReceiptStatus::Withdrawn,
            updated_at: Utc::now(),
        })
    }

    async fn load_user(&self, id: &UserId) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| Error::UserNotFound(id.clone()))
    }

    async fn load_connection(&self, id: &ConnectionId) -> Result<Connection> {
        self.store
            .get_connection(id)
            .await?
            .ok_or_else(|| Error::ConnectionNotFound(id.clone()))
    }

    async fn invalidate(&self, connection: &Connection) {
        if let Err(e) = self
            .cache
            .invalidate_suggestions(&connection.requester_id, &connection.addressee_id)
            .await
        {
            warn!(
                connection_id = %connection.id,
                error = %e,
                "Suggestion cache invalidation failed"
            );
        }
    }
}

fn receipt(connection: &Connection) -> ConnectionReceipt {
    ConnectionReceipt {
        id: connection.id.clone(),
        status: connection.status.into(),
        updated_at: connection.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::error::ErrorKind;
    use crate::storage::in_memory::InMemoryStore;
    use rstest::rstest;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCache {
        calls: Mutex<Vec<(UserId, UserId)>>,
    }

    #[async_trait]
    impl SuggestionCache for RecordingCache {
        async fn invalidate_suggestions(&self, a: &UserId, b: &UserId) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push((a.clone(), b.clone()));
            Ok(())
        }
    }

    struct FailingCache;

    #[async_trait]
    impl SuggestionCache for FailingCache {
        async fn invalidate_suggestions(&self, _a: &UserId, _b: &UserId) -> anyhow::Result<()> {
            anyhow::bail!("cache unavailable")
        }
    }

    async fn lifecycle_with(users: &[(&str, Role)]) -> (ConnectionLifecycle, Arc<RecordingCache>) {
        let store = InMemoryStore::new();
        for (id, role) in users {
            store.upsert_user(User::new(*id, *role)).await.unwrap();
        }
        let cache = Arc::new(RecordingCache::default());
        let lifecycle = ConnectionLifecycle::new(Arc::new(store), Arc::new(PolicyMatrix::builtin()))
            .with_cache(cache.clone());
        (lifecycle, cache)
    }

    fn uid(id: &str) -> UserId {
        UserId::new(id)
    }

    #[tokio::test]
    async fn test_request_creates_pending_and_invalidates() {
        let (lifecycle, cache) = lifecycle_with(&[("a", Role::User), ("b", Role::Company)]).await;

        let connection = lifecycle
            .request(ConnectionRequest::new("a", "b").with_note("  Hello  ").with_tag(" "))
            .await
            .unwrap();

        assert_eq!(connection.status, ConnectionStatus::Pending);
        assert_eq!(connection.notes.as_deref(), Some("Hello"));
        assert!(connection.relationship_tag.is_none());
        assert_eq!(cache.calls.lock().unwrap().as_slice(), &[(uid("a"), uid("b"))]);
    }

    #[rstest]
    #[case("a", "a")]
    #[case("", "b")]
    #[case("a", "   ")]
    #[tokio::test]
    async fn test_request_validation(#[case] from: &str, #[case] to: &str) {
        let (lifecycle, _) = lifecycle_with(&[("a", Role::User), ("b", Role::User)]).await;
        let err = lifecycle.request(ConnectionRequest::new(from, to)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_request_rejects_oversized_note() {
        let (lifecycle, _) = lifecycle_with(&[("a", Role::User), ("b", Role::User)]).await;
        let note = "x".repeat(MAX_NOTE_LENGTH + 1);
        let err = lifecycle
            .request(ConnectionRequest::new("a", "b").with_note(note))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("Note")));
    }

    #[tokio::test]
    async fn test_request_unknown_user() {
        let (lifecycle, _) = lifecycle_with(&[("a", Role::User)]).await;
        let err = lifecycle.request(ConnectionRequest::new("a", "ghost")).await.unwrap_err();
        assert!(matches!(err, Error::UserNotFound(ref id) if id.as_str() == "ghost"));
    }

    #[tokio::test]
    async fn test_request_policy_denied_mentions_role() {
        let (lifecycle, cache) =
            lifecycle_with(&[("boss", Role::Admin), ("f", Role::Freelancer)]).await;
        let err = lifecycle.request(ConnectionRequest::new("boss", "f")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(err.to_string().contains("role"));
        assert!(cache.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_is_idempotent() {
        let (lifecycle, cache) = lifecycle_with(&[("a", Role::User), ("b", Role::User)]).await;
        let connection = lifecycle.request(ConnectionRequest::new("a", "b")).await.unwrap();

        let first = lifecycle
            .respond(&connection.id, &uid("b"), Decision::Accept)
            .await
            .unwrap();
        let second = lifecycle
            .respond(&connection.id, &uid("b"), Decision::Accept)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.status, ReceiptStatus::Accepted);
        // request + one accept
        assert_eq!(cache.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reject_after_accept_conflicts() {
        let (lifecycle, _) = lifecycle_with(&[("a", Role::User), ("b", Role::User)]).await;
        let connection = lifecycle.request(ConnectionRequest::new("a", "b")).await.unwrap();
        lifecycle
            .respond(&connection.id, &uid("b"), Decision::Accept)
            .await
            .unwrap();

        let err = lifecycle
            .respond(&connection.id, &uid("b"), Decision::Reject)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_only_addressee_may_respond() {
        let (lifecycle, _) = lifecycle_with(&[("a", Role::User), ("b", Role::User)]).await;
        let connection = lifecycle.request(ConnectionRequest::new("a", "b")).await.unwrap();

        let err = lifecycle
            .respond(&connection.id, &uid("a"), Decision::Accept)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Authorization(AuthorizationError::Respond { .. })
        ));
    }

    #[tokio::test]
    async fn test_respond_withdraw_delegates() {
        let (lifecycle, _) = lifecycle_with(&[("a", Role::User), ("b", Role::User)]).await;
        let connection = lifecycle.request(ConnectionRequest::new("a", "b")).await.unwrap();

        let receipt = lifecycle
            .respond(&connection.id, &uid("a"), Decision::Withdraw)
            .await
            .unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Withdrawn);

        let err = lifecycle
            .withdraw(&connection.id, &uid("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionNotFound(_)));
    }

    #[tokio::test]
    async fn test_withdraw_rules() {
        let (lifecycle, _) = lifecycle_with(&[("a", Role::User), ("b", Role::User)]).await;
        let connection = lifecycle.request(ConnectionRequest::new("a", "b")).await.unwrap();

        let by_addressee = lifecycle.withdraw(&connection.id, &uid("b")).await.unwrap_err();
        assert!(matches!(
            by_addressee,
            Error::Authorization(AuthorizationError::Withdraw { .. })
        ));

        lifecycle
            .respond(&connection.id, &uid("b"), Decision::Accept)
            .await
            .unwrap();
        let after_accept = lifecycle.withdraw(&connection.id, &uid("a")).await.unwrap_err();
        assert_eq!(after_accept.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_cache_failure_does_not_fail_request() {
        let store = InMemoryStore::new();
        store.upsert_user(User::new("a", Role::User)).await.unwrap();
        store.upsert_user(User::new("b", Role::User)).await.unwrap();
        let lifecycle = ConnectionLifecycle::new(Arc::new(store), Arc::new(PolicyMatrix::builtin()))
            .with_cache(Arc::new(FailingCache));

        let connection = lifecycle.request(ConnectionRequest::new("a", "b")).await.unwrap();
        let receipt = lifecycle
            .respond(&connection.id, &uid("b"), Decision::Reject)
            .await
            .unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Rejected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_requests_create_one_connection() {
        let (lifecycle, _) = lifecycle_with(&[("a", Role::User), ("b", Role::User)]).await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let lifecycle = lifecycle.clone();
                let request = if i % 2 == 0 {
                    ConnectionRequest::new("a", "b")
                } else {
                    ConnectionRequest::new("b", "a")
                };
                tokio::spawn(async move { lifecycle.request(request).await })
            })
            .collect();

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) if e.kind() == ErrorKind::Conflict => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(conflicts, 7);
    }
}
