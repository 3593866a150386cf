//! Hash-based connection ID generation.
//!
//! Connection IDs are derived from SHA256 over the two parties, a timestamp
//! and a retry nonce, then base36-encoded.
//!
//! # Features
//!
//! - **Adaptive length**: ID length grows with the number of stored connections (6-8 characters)
//! - **Collision resistant**: nonce retry against the set of known IDs
//! - **Format**: `conn-{hash}` (e.g., "conn-k3f80a")
//!
//! # Example
//!
//! ```
//! use liaison::domain::UserId;
//! use liaison::id_generation::ConnectionIdGenerator;
//!
//! let mut generator = ConnectionIdGenerator::new(0);
//! let id = generator
//!     .generate(&UserId::new("alice"), &UserId::new("bob"))
//!     .unwrap();
//! assert!(id.as_str().starts_with("conn-"));
//! ```

use crate::domain::{ConnectionId, UserId};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix shared by every connection ID.
pub const CONNECTION_ID_PREFIX: &str = "conn";

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;
const MAX_ID_LENGTH: usize = 8;

/// Errors that can occur during ID generation
#[derive(Debug, Error)]
pub enum IdGenerationError {
    /// Unable to generate a unique ID after exhausting all nonces and length increases
    #[error("Unable to generate unique ID after {attempts} attempts")]
    CollisionExhausted {
        /// Number of nonces tried
        attempts: u32,
    },

    /// Invalid length parameter
    #[error("Length must be greater than 0")]
    InvalidLength,
}

/// Hash-based connection ID generator with collision detection
pub struct ConnectionIdGenerator {
    connection_count: usize,
    existing_ids: HashSet<String>,
}

impl ConnectionIdGenerator {
    /// Create a generator sized for `connection_count` stored connections.
    #[must_use]
    pub fn new(connection_count: usize) -> Self {
        Self {
            connection_count,
            existing_ids: HashSet::new(),
        }
    }

    /// Register an existing ID to prevent collisions
    pub fn register_id(&mut self, id: &ConnectionId) {
        self.existing_ids.insert(id.as_str().to_string());
        self.connection_count = self.connection_count.max(self.existing_ids.len());
    }

    /// Forget an ID after its connection was deleted.
    pub fn release_id(&mut self, id: &ConnectionId) {
        self.existing_ids.remove(id.as_str());
    }

    /// Generate a new unique ID for a connection between two users.
    ///
    /// # Errors
    ///
    /// Returns an error if no unique ID could be produced after trying all
    /// nonces at every permitted length.
    pub fn generate(
        &mut self,
        requester: &UserId,
        addressee: &UserId,
    ) -> Result<ConnectionId, IdGenerationError> {
        let mut id_length = self.adaptive_length();

        while id_length <= MAX_ID_LENGTH {
            for nonce in 0..MAX_NONCE {
                let id = hash_id(requester, addressee, nonce, id_length)?;

                if self.existing_ids.insert(id.clone()) {
                    if nonce > 0 {
                        debug!(nonce, id_length, "Generated unique connection ID after retries");
                    }
                    self.connection_count += 1;
                    return Ok(ConnectionId::new(id));
                }
            }

            warn!(
                id_length,
                max_nonce = MAX_NONCE,
                "All nonces exhausted, increasing connection ID length"
            );
            id_length += 1;
        }

        Err(IdGenerationError::CollisionExhausted {
            attempts: MAX_NONCE,
        })
    }

    /// Determine ID length based on stored connection count
    ///
    /// - 0-5,000 connections: 6 chars
    /// - 5,001-50,000: 7 chars
    /// - 50,000+: 8 chars
    fn adaptive_length(&self) -> usize {
        match self.connection_count {
            0..=5_000 => 6,
            5_001..=50_000 => 7,
            _ => 8,
        }
    }
}

fn hash_id(
    requester: &UserId,
    addressee: &UserId,
    nonce: u32,
    length: usize,
) -> Result<String, IdGenerationError> {
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let content = format!("{requester}|{addressee}|{timestamp}|{nonce}");

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash_bytes = hasher.finalize();

    let hash_str = encode_base36(&hash_bytes[..8], length)?;
    Ok(format!("{CONNECTION_ID_PREFIX}-{hash_str}"))
}

/// Encode bytes as a fixed-length base36 string.
///
/// Input is limited to 8 bytes by the caller so it fits a `u64`.
fn encode_base36(bytes: &[u8], length: usize) -> Result<String, IdGenerationError> {
    if length == 0 {
        return Err(IdGenerationError::InvalidLength);
    }

    let mut num: u64 = 0;
    for &byte in bytes {
        num = num.wrapping_shl(8).wrapping_add(u64::from(byte));
    }

    let mut result = Vec::with_capacity(length);
    while result.len() < length {
        let remainder = (num % 36) as usize;
        result.push(char::from(BASE36_CHARS[remainder]));
        num /= 36;
    }

    Ok(result.into_iter().rev().collect())
}

/// Check that an ID has the `conn-{base36}` shape.
#[must_use]
pub fn validate_connection_id(id: &str) -> bool {
    let Some(hash) = id.strip_prefix(&format!("{CONNECTION_ID_PREFIX}-")) else {
        return false;
    };

    (1..=MAX_ID_LENGTH).contains(&hash.len())
        && hash
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
}
