//! JSONL persistence through the storage factory.

use liaison::domain::{ConnectionStatus, NewConnection, Role, User, UserId};
use liaison::storage::in_memory::{load_from_jsonl, LoadWarning};
use liaison::storage::{create_storage, NetworkStore, StorageBackend};
use std::path::PathBuf;
use tempfile::TempDir;

fn backend(dir: &TempDir) -> (StorageBackend, PathBuf, PathBuf) {
    let users = dir.path().join("users.jsonl");
    let connections = dir.path().join("connections.jsonl");
    (
        StorageBackend::Jsonl {
            users: users.clone(),
            connections: connections.clone(),
        },
        users,
        connections,
    )
}

fn new_connection(requester: &str, addressee: &str) -> NewConnection {
    NewConnection {
        requester_id: UserId::new(requester),
        addressee_id: UserId::new(addressee),
        relationship_tag: Some("colleague".to_string()),
        notes: None,
    }
}

#[tokio::test]
async fn test_missing_files_load_as_empty() {
    let temp = TempDir::new().unwrap();
    let (backend, _, _) = backend(&temp);

    let store = create_storage(backend).await.unwrap();
    let snapshot = store.export_all().await.unwrap();

    assert!(snapshot.users.is_empty());
    assert!(snapshot.connections.is_empty());
}

#[tokio::test]
async fn test_records_survive_save_and_reopen() {
    let temp = TempDir::new().unwrap();
    let (backend, users_path, _) = backend(&temp);

    let store = create_storage(backend.clone()).await.unwrap();
    store
        .upsert_user(User::new("ada", Role::Freelancer).with_name("Ada", "Lovelace"))
        .await
        .unwrap();
    store.upsert_user(User::new("bob", Role::Company)).await.unwrap();
    let created = store.create_pending(new_connection("ada", "bob")).await.unwrap();
    store
        .transition_status(&created.id, ConnectionStatus::Pending, ConnectionStatus::Accepted)
        .await
        .unwrap();
    store.save().await.unwrap();

    let users_text = std::fs::read_to_string(&users_path).unwrap();
    assert_eq!(users_text.lines().count(), 2);

    let reopened = create_storage(backend).await.unwrap();
    let ada = reopened.get_user(&UserId::new("ada")).await.unwrap().unwrap();
    assert_eq!(ada.first_name.as_deref(), Some("Ada"));

    let connection = reopened.get_connection(&created.id).await.unwrap().unwrap();
    assert_eq!(connection.status, ConnectionStatus::Accepted);
    assert_eq!(connection.relationship_tag.as_deref(), Some("colleague"));
    assert!(connection.connected_at.is_some());

    let edges = reopened
        .accepted_connections_touching(&[UserId::new("bob")])
        .await
        .unwrap();
    assert_eq!(edges.len(), 1);
}

#[tokio::test]
async fn test_reload_discards_unsaved_changes() {
    let temp = TempDir::new().unwrap();
    let (backend, _, _) = backend(&temp);

    let store = create_storage(backend).await.unwrap();
    store.upsert_user(User::new("ada", Role::User)).await.unwrap();
    store.save().await.unwrap();

    store.upsert_user(User::new("bob", Role::User)).await.unwrap();
    store.reload().await.unwrap();

    assert!(store.get_user(&UserId::new("ada")).await.unwrap().is_some());
    assert!(store.get_user(&UserId::new("bob")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_lines_become_warnings() {
    let temp = TempDir::new().unwrap();
    let (_, users_path, connections_path) = backend(&temp);

    let ada = serde_json::to_string(&User::new("ada", Role::User)).unwrap();
    std::fs::write(&users_path, format!("{ada}\n{{not json\n\n")).unwrap();

    let (store, warnings) = load_from_jsonl(&users_path, &connections_path).await.unwrap();

    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0],
        LoadWarning::MalformedJson { line_number: 2, .. }
    ));
    assert!(store.get_user(&UserId::new("ada")).await.unwrap().is_some());
}
