//! CLI argument structs for all commands.

use clap::Parser;

use super::types::{DecisionArg, RoleArg};
use super::validators::{validate_connection, validate_id, validate_note, validate_tag};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Rewrite the configuration of an existing repository
    ///
    /// Existing users and connections are kept.
    #[arg(short, long)]
    pub force: bool,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `network` command
#[derive(Parser, Debug, Clone)]
pub struct NetworkArgs {
    /// User whose network to show
    #[arg(value_parser = validate_id)]
    pub subject: String,

    /// User viewing the network (defaults to the subject)
    ///
    /// Only the subject or an admin may view a network.
    #[arg(long, value_parser = validate_id)]
    pub viewer: Option<String>,

    /// Include pending invitations
    #[arg(short, long)]
    pub pending: bool,
}

/// Arguments for the `request` command
#[derive(Parser, Debug, Clone)]
pub struct RequestArgs {
    /// User sending the request
    #[arg(value_parser = validate_id)]
    pub requester: String,

    /// User receiving the request
    #[arg(value_parser = validate_id)]
    pub target: String,

    /// Note to the recipient (max 500 characters)
    #[arg(short, long, value_parser = validate_note)]
    pub note: Option<String>,

    /// Relationship tag, e.g. "former colleague" (max 64 characters)
    #[arg(short, long, value_parser = validate_tag)]
    pub tag: Option<String>,
}

/// Arguments for the `respond` command
#[derive(Parser, Debug, Clone)]
pub struct RespondArgs {
    /// Connection ID
    #[arg(value_parser = validate_connection)]
    pub connection: String,

    /// User responding (must be the recipient, or the sender for withdraw)
    #[arg(short, long, value_parser = validate_id)]
    pub actor: String,

    /// Decision
    #[arg(short, long, value_enum)]
    pub decision: DecisionArg,
}

/// Arguments for the `withdraw` command
#[derive(Parser, Debug, Clone)]
pub struct WithdrawArgs {
    /// Connection ID
    #[arg(value_parser = validate_connection)]
    pub connection: String,

    /// User withdrawing (must be the sender)
    #[arg(short, long, value_parser = validate_id)]
    pub actor: String,
}

/// Arguments for the `policy` command
#[derive(Parser, Debug, Clone)]
pub struct PolicyArgs {
    /// Show only this role's allowed set
    #[arg(short, long, value_enum)]
    pub role: Option<RoleArg>,
}

/// Arguments for the `user` command
#[derive(Parser, Debug, Clone)]
pub struct UserArgs {
    /// User ID
    #[arg(value_parser = validate_id)]
    pub id: String,

    /// Account role
    #[arg(short, long, value_enum)]
    pub role: RoleArg,

    /// Given name
    #[arg(long)]
    pub first_name: Option<String>,

    /// Family name
    #[arg(long)]
    pub last_name: Option<String>,

    /// Contact email
    #[arg(long)]
    pub email: Option<String>,

    /// Professional headline
    #[arg(long)]
    pub headline: Option<String>,
}
