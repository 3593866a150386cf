//! Error types for liaison operations.
//!
//! Errors fall into two groups:
//!
//! - **Expected outcomes** (`Validation`, `UserNotFound`, `ConnectionNotFound`,
//!   `Authorization`, `Conflict`): the caller asked for something the graph
//!   does not allow. Transport layers map these to client status codes and
//!   they are never logged as system failures.
//! - **Internal failures** (`Storage`, `Config`, `Io`, `Json`): infrastructure
//!   problems surfaced as fatal errors.

use crate::domain::{ConnectionId, Role, UserId};
use std::io;
use thiserror::Error;

/// The error type for liaison operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing required input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced user does not exist.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Referenced connection does not exist.
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// Actor lacks the right for the requested action.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// A connection already exists, or the connection is not in the state the
    /// operation requires.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Authorization failures, one variant per guarded action so clients can
/// render precise guidance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    /// Viewer is neither the subject nor an admin.
    #[error("You are not allowed to view the connection network of {subject}")]
    ViewNetwork {
        /// The user attempting to view the network.
        viewer: UserId,
        /// The owner of the network.
        subject: UserId,
    },

    /// The role policy forbids a connection between the two roles.
    #[error("Your role ({requester_role}) cannot connect with {target_role} accounts")]
    RoleNotPermitted {
        /// Role of the requesting user.
        requester_role: Role,
        /// Role of the target user.
        target_role: Role,
    },

    /// Only the addressee may accept or reject.
    #[error("Only the recipient of connection {connection} can respond to it")]
    Respond {
        /// The connection being answered.
        connection: ConnectionId,
        /// The user who attempted the response.
        actor: UserId,
    },

    /// Only the requester may withdraw.
    #[error("Only the sender of connection {connection} can withdraw it")]
    Withdraw {
        /// The connection being withdrawn.
        connection: ConnectionId,
        /// The user who attempted the withdrawal.
        actor: UserId,
    },
}

/// Coarse classification used by transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input (400).
    Validation,
    /// Missing user or connection (404).
    NotFound,
    /// Forbidden action (403).
    Authorization,
    /// State conflict (409).
    Conflict,
    /// Anything else (500).
    Internal,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::UserNotFound(_) | Self::ConnectionNotFound(_) => ErrorKind::NotFound,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Storage(_) | Self::Config(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Internal,
        }
    }

    /// Returns `true` for the expected, client-correctable outcomes.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        self.kind() != ErrorKind::Internal
    }

    /// HTTP-style status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

/// A specialized Result type for liaison operations.
pub type Result<T> = std::result::Result<T, Error>;
