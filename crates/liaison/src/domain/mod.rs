//! Domain types for the connection graph.
//!
//! Users and their profiles are owned by an external identity service and are
//! read-only here. Connections are the edges of the graph: an ordered
//! requester/addressee pair with a status and relationship metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of the free-text note attached to a connection request.
pub const MAX_NOTE_LENGTH: usize = 500;

/// Maximum length of a relationship tag.
pub const MAX_TAG_LENGTH: usize = 64;

/// Unique identifier for a user
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the ID is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Create a new connection ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Account role. Closed set; the connection policy is keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Generic member
    User,
    /// Independent professional
    Freelancer,
    /// Agency account
    Agency,
    /// Company account
    Company,
    /// Mentor
    Mentor,
    /// Recruiter
    Headhunter,
    /// Platform administrator
    Admin,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 7] = [
        Role::User,
        Role::Freelancer,
        Role::Agency,
        Role::Company,
        Role::Mentor,
        Role::Headhunter,
        Role::Admin,
    ];

    /// Lowercase wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Freelancer => "freelancer",
            Role::Agency => "agency",
            Role::Company => "company",
            Role::Mentor => "mentor",
            Role::Headhunter => "headhunter",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| format!("Unknown role: '{s}'"))
    }
}

/// Profile snapshot attached to a user. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// One-line professional headline
    pub headline: Option<String>,

    /// Free-text location
    pub location: Option<String>,

    /// Avatar URL or storage key
    pub avatar_url: Option<String>,

    /// Longer biography
    pub bio: Option<String>,

    /// Areas of expertise or interest
    pub focus_areas: Vec<String>,

    /// Availability status, e.g. "open_to_work"
    pub availability_status: Option<String>,

    /// Weekly hours available
    pub weekly_hours: Option<u32>,

    /// Whether remote engagements are accepted
    pub remote: Option<bool>,

    /// Free-text availability notes
    pub availability_notes: Option<String>,

    /// Preferred engagement types, e.g. "contract", "full-time"
    pub preferred_engagements: Vec<String>,

    /// Trust score computed by the reputation service
    pub trust_score: Option<f64>,
}

/// A user as seen by the connection graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: UserId,

    /// Account role
    pub role: Role,

    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,

    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,

    /// Contact email, used as a display fallback
    #[serde(default)]
    pub email: Option<String>,

    /// Profile snapshot, absent for users who never filled one in
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl User {
    /// Create a user with only an id and role.
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            first_name: None,
            last_name: None,
            email: None,
            profile: None,
        }
    }

    /// Set the given and family names.
    #[must_use]
    pub fn with_name(mut self, first: &str, last: &str) -> Self {
        self.first_name = Some(first.to_string());
        self.last_name = Some(last.to_string());
        self
    }

    /// Attach a profile.
    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }
}

/// Stored status of a connection.
///
/// Withdrawal deletes the record and is therefore not a stored status; see
/// [`ReceiptStatus::Withdrawn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Awaiting the addressee's response
    Pending,
    /// Both parties are connected
    Accepted,
    /// The addressee declined
    Rejected,
}

impl ConnectionStatus {
    /// Pending and accepted connections occupy the pair; at most one may exist.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A connection between two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier
    pub id: ConnectionId,

    /// User who sent the request
    pub requester_id: UserId,

    /// User who received the request
    pub addressee_id: UserId,

    /// Current status
    pub status: ConnectionStatus,

    /// When the connection was accepted
    #[serde(default)]
    pub connected_at: Option<DateTime<Utc>>,

    /// Most recent interaction between the two parties
    #[serde(default)]
    pub last_interacted_at: Option<DateTime<Utc>>,

    /// Relationship label, e.g. "former colleague"
    #[serde(default)]
    pub relationship_tag: Option<String>,

    /// Free-text note supplied with the request
    #[serde(default)]
    pub notes: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// The party that is not `user`, or `None` if `user` is not a party.
    #[must_use]
    pub fn counterpart(&self, user: &UserId) -> Option<&UserId> {
        if &self.requester_id == user {
            Some(&self.addressee_id)
        } else if &self.addressee_id == user {
            Some(&self.requester_id)
        } else {
            None
        }
    }

    /// Returns `true` if this connection joins `a` and `b` in either direction.
    #[must_use]
    pub fn joins(&self, a: &UserId, b: &UserId) -> bool {
        (&self.requester_id == a && &self.addressee_id == b)
            || (&self.requester_id == b && &self.addressee_id == a)
    }
}

/// Data for creating a new pending connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConnection {
    /// Requesting user
    pub requester_id: UserId,

    /// Target user
    pub addressee_id: UserId,

    /// Optional relationship label
    pub relationship_tag: Option<String>,

    /// Optional note to the addressee
    pub notes: Option<String>,
}

/// Response to a pending connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Addressee accepts
    Accept,
    /// Addressee declines
    Reject,
    /// Requester takes the request back
    Withdraw,
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            "withdraw" => Ok(Self::Withdraw),
            other => Err(format!(
                "Unknown decision '{other}'. Expected accept, reject or withdraw"
            )),
        }
    }
}

/// Status reported back to the caller of a lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    /// Still pending
    Pending,
    /// Accepted
    Accepted,
    /// Rejected
    Rejected,
    /// Deleted by the requester
    Withdrawn,
}

impl From<ConnectionStatus> for ReceiptStatus {
    fn from(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Pending => Self::Pending,
            ConnectionStatus::Accepted => Self::Accepted,
            ConnectionStatus::Rejected => Self::Rejected,
        }
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
            Self::Withdrawn => write!(f, "withdrawn"),
        }
    }
}

/// Outcome of a respond or withdraw operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReceipt {
    /// Connection the operation applied to
    pub id: ConnectionId,

    /// Resulting status
    pub status: ReceiptStatus,

    /// When the change happened
    pub updated_at: DateTime<Utc>,
}
