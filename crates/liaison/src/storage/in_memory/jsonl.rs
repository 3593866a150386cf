//! JSONL persistence for in-memory storage.
//!
//! Users and connections live in two JSON Lines files. Loading is resilient:
//! malformed lines and records that would break store invariants are skipped
//! and reported as [`LoadWarning`]s. Saving writes each file atomically with
//! the temp-file-then-rename pattern.
//!
//! [`fingerprint_files`] hashes the on-disk contents of both files so a
//! caller can tell whether another process rewrote them after a load.

use super::InMemoryStore;
use crate::domain::{Connection, ConnectionId, User, UserId};
use crate::error::{Error, Result};
use crate::storage::NetworkStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Warnings that can occur during JSONL file loading.
///
/// These are non-fatal: the store is still built, with the offending line or
/// record left out.
///
/// **Example:**
/// ```no_run
/// # use liaison::storage::in_memory::{load_from_jsonl, LoadWarning};
/// # use std::path::Path;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> anyhow::Result<()> {
/// let (store, warnings) = load_from_jsonl(
///     Path::new(".liaison/users.jsonl"),
///     Path::new(".liaison/connections.jsonl"),
/// ).await?;
///
/// for warning in warnings {
///     if let LoadWarning::MalformedJson { file, line_number, error } = warning {
///         eprintln!("Skipped {file}:{line_number}: {error}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Line could not be parsed into a record
    MalformedJson {
        /// File the line came from
        file: String,
        /// 1-based line number
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// A second user record with an already-loaded ID; the first one is kept
    DuplicateUser {
        /// Repeated ID
        user_id: UserId,
    },

    /// A second connection record with an already-loaded ID
    DuplicateConnectionId {
        /// Repeated ID
        connection_id: ConnectionId,
    },

    /// Connection whose requester and addressee are the same user
    SelfConnection {
        /// Offending connection
        connection_id: ConnectionId,
    },

    /// Connection referencing a user that is not in the users file
    OrphanedConnection {
        /// Offending connection
        connection_id: ConnectionId,
        /// Endpoint that could not be found
        missing_user: UserId,
    },

    /// A pending/accepted connection for a pair that already has one
    DuplicateActivePair {
        /// Skipped connection
        connection_id: ConnectionId,
        /// Connection that was kept
        existing: ConnectionId,
    },
}

/// Load a store from the users and connections JSONL files.
///
/// A missing file is treated as empty so a fresh repository loads cleanly.
///
/// # Errors
///
/// Returns `Error::Io` if a file exists but cannot be read.
pub async fn load_from_jsonl(
    users_path: &Path,
    connections_path: &Path,
) -> Result<(InMemoryStore, Vec<LoadWarning>)> {
    let mut warnings = Vec::new();

    let users: Vec<User> = read_records(users_path, &mut warnings).await?;
    let connections: Vec<Connection> = read_records(connections_path, &mut warnings).await?;

    let (store, record_warnings) = InMemoryStore::from_records(users, connections);
    warnings.extend(record_warnings);

    tracing::debug!(
        users = %users_path.display(),
        connections = %connections_path.display(),
        warnings = warnings.len(),
        "Loaded JSONL store"
    );

    Ok((store, warnings))
}

/// Save every record of `store` to the two JSONL files.
///
/// Output is sorted (users by ID, connections by creation time then ID) so
/// repeated saves of the same data produce identical files.
///
/// # Errors
///
/// Returns `Error::Io` or `Error::Json` if writing fails; the previous file
/// contents are left intact in that case.
pub async fn save_to_jsonl(
    store: &dyn NetworkStore,
    users_path: &Path,
    connections_path: &Path,
) -> Result<()> {
    let mut snapshot = store.export_all().await?;

    snapshot.users.sort_by(|a, b| a.id.cmp(&b.id));
    snapshot
        .connections
        .sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    write_atomic(users_path, &snapshot.users).await?;
    write_atomic(connections_path, &snapshot.connections).await?;
    Ok(())
}

/// SHA-256 over the current bytes of both files.
///
/// A missing file hashes differently from an empty one.
///
/// # Errors
///
/// Returns `Error::Io` if a file exists but cannot be read.
pub async fn fingerprint_files(users_path: &Path, connections_path: &Path) -> Result<Vec<u8>> {
    let mut hasher = Sha256::new();
    for path in [users_path, connections_path] {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                hasher.update([1u8]);
                hasher.update((bytes.len() as u64).to_le_bytes());
                hasher.update(&bytes);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => hasher.update([0u8]),
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(hasher.finalize().to_vec())
}

async fn read_records<T: DeserializeOwned>(
    path: &Path,
    warnings: &mut Vec<LoadWarning>,
) -> Result<Vec<T>> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::Io(e)),
    };

    let mut lines = BufReader::new(file).split(b'\n');
    let mut records = Vec::new();
    let mut line_number = 0;

    while let Some(bytes) = lines.next_segment().await? {
        line_number += 1;
        let parsed = std::str::from_utf8(&bytes)
            .map_err(|e| e.to_string())
            .and_then(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                serde_json::from_str(trimmed)
                    .map(Some)
                    .map_err(|e| e.to_string())
            });

        match parsed {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(error) => warnings.push(LoadWarning::MalformedJson {
                file: path.display().to_string(),
                line_number,
                error,
            }),
        }
    }

    Ok(records)
}

/// Write records to `path` via a sibling `.tmp` file and an atomic rename.
async fn write_atomic<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let file = File::create(&temp_path).await?;
    let mut writer = BufWriter::new(file);

    for record in records {
        let json = serde_json::to_string(record)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;
    tokio::fs::rename(&temp_path, path).await?;

    Ok(())
}
