//! NetworkStore trait implementation for in-memory storage.

use super::graph::{accepted_touching, active_between, connections_of};
use super::InMemoryStore;
use crate::domain::{Connection, ConnectionId, ConnectionStatus, NewConnection, User, UserId};
use crate::error::{Error, Result};
use crate::storage::{NetworkStore, StoreSnapshot};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;

#[async_trait]
impl NetworkStore for InMemoryStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(id).cloned())
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>> {
        let inner = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.users.get(id).map(|user| (id.clone(), user.clone())))
            .collect())
    }

    async fn upsert_user(&self, user: User) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.upsert_user(user);
        Ok(())
    }

    async fn get_connection(&self, id: &ConnectionId) -> Result<Option<Connection>> {
        let inner = self.inner.lock().await;
        Ok(inner.connections.get(id).cloned())
    }

    async fn accepted_connections_touching(&self, ids: &[UserId]) -> Result<Vec<Connection>> {
        let inner = self.inner.lock().await;
        Ok(accepted_touching(&inner, ids))
    }

    async fn pending_connections_for(&self, id: &UserId) -> Result<Vec<Connection>> {
        let inner = self.inner.lock().await;
        let mut pending: Vec<Connection> = connections_of(&inner, id)
            .filter(|connection| connection.status == ConnectionStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(pending)
    }

    async fn responded_connections_for_addressee(&self, id: &UserId) -> Result<Vec<Connection>> {
        let inner = self.inner.lock().await;
        Ok(connections_of(&inner, id)
            .filter(|connection| &connection.addressee_id == id)
            .filter(|connection| {
                matches!(
                    connection.status,
                    ConnectionStatus::Accepted | ConnectionStatus::Rejected
                )
            })
            .cloned()
            .collect())
    }

    async fn create_pending(&self, new_connection: NewConnection) -> Result<Connection> {
        let mut inner = self.inner.lock().await;

        // === Phase 1: All validations (no mutations) ===
        if new_connection.requester_id == new_connection.addressee_id {
            return Err(Error::Validation(
                "A user cannot connect with themselves".to_string(),
            ));
        }

        if let Some(existing) = active_between(
            &inner,
            &new_connection.requester_id,
            &new_connection.addressee_id,
        ) {
            return Err(Error::Conflict(format!(
                "A {} connection ({}) already exists between {} and {}",
                existing.status,
                existing.id,
                new_connection.requester_id,
                new_connection.addressee_id
            )));
        }

        // === Phase 2: ID generation ===
        let id = inner
            .id_generator
            .generate(&new_connection.requester_id, &new_connection.addressee_id)
            .map_err(|e| Error::Storage(format!("ID generation failed: {e}")))?;

        // === Phase 3: Insert ===
        let now = Utc::now();
        let connection = Connection {
            id,
            requester_id: new_connection.requester_id,
            addressee_id: new_connection.addressee_id,
            status: ConnectionStatus::Pending,
            connected_at: None,
            last_interacted_at: None,
            relationship_tag: new_connection.relationship_tag,
            notes: new_connection.notes,
            created_at: now,
            updated_at: now,
        };
        inner.insert_connection(connection.clone());

        Ok(connection)
    }

    async fn transition_status(
        &self,
        id: &ConnectionId,
        expected: ConnectionStatus,
        next: ConnectionStatus,
    ) -> Result<Connection> {
        let mut inner = self.inner.lock().await;

        let connection = inner
            .connections
            .get_mut(id)
            .ok_or_else(|| Error::ConnectionNotFound(id.clone()))?;

        if connection.status != expected {
            return Err(Error::Conflict(format!(
                "Connection {id} is {} (expected {expected})",
                connection.status
            )));
        }

        let now = Utc::now();
        connection.status = next;
        connection.updated_at = now;
        if next == ConnectionStatus::Accepted {
            connection.connected_at.get_or_insert(now);
            connection.last_interacted_at = Some(now);
        }

        Ok(connection.clone())
    }

    async fn delete_pending(&self, id: &ConnectionId) -> Result<Connection> {
        let mut inner = self.inner.lock().await;

        let status = inner
            .connections
            .get(id)
            .map(|connection| connection.status)
            .ok_or_else(|| Error::ConnectionNotFound(id.clone()))?;

        if status != ConnectionStatus::Pending {
            return Err(Error::Conflict(format!(
                "Connection {id} is {status}; only pending requests can be withdrawn"
            )));
        }

        inner
            .remove_connection(id)
            .ok_or_else(|| Error::ConnectionNotFound(id.clone()))
    }

    async fn export_all(&self) -> Result<StoreSnapshot> {
        let inner = self.inner.lock().await;
        Ok(StoreSnapshot {
            users: inner.users.values().cloned().collect(),
            connections: inner.connections.values().cloned().collect(),
        })
    }

    async fn save(&self) -> Result<()> {
        // In-memory storage has nothing to persist
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        // No backing store to reload from
        Ok(())
    }
}
