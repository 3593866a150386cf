//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: Initialize a new liaison repository
//! - `network`: Show a user's 1st/2nd/3rd-degree network
//! - `request`: Send a connection request
//! - `respond`: Accept, reject or withdraw a request
//! - `withdraw`: Withdraw a pending request
//! - `policy`: Show the role connection policy
//! - `user`: Add or update a user record
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! liaison user u1 --role freelancer --first-name Ada --last-name Lovelace
//! liaison request u1 u2 --note "Met at RustConf"
//! liaison respond conn-a1b2c3 --actor u2 --decision accept
//! liaison --json network u1 --pending
//! ```

mod args;
mod execute;
mod types;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

// Re-export argument structs
pub use args::{
    InitArgs, NetworkArgs, PolicyArgs, RequestArgs, RespondArgs, UserArgs, WithdrawArgs,
};

// Re-export types
pub use types::{DecisionArg, RoleArg};

// Re-export validators for external use
pub use validators::{validate_connection, validate_id, validate_note, validate_tag};

/// Liaison - professional connection graph
///
/// Explore multi-degree networks, send and answer connection requests, and
/// inspect the role policy. Data lives in `.liaison/` as JSONL files.
#[derive(Parser, Debug)]
#[command(name = "liaison")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new liaison repository
    ///
    /// Creates the `.liaison/` directory with configuration and empty data files.
    Init(InitArgs),

    /// Show a user's connection network
    ///
    /// Lists 1st, 2nd and 3rd-degree connections with introduction paths,
    /// mutual connections, suggestions and invitation statistics.
    Network(NetworkArgs),

    /// Send a connection request
    Request(RequestArgs),

    /// Respond to a connection request
    Respond(RespondArgs),

    /// Withdraw a pending connection request
    Withdraw(WithdrawArgs),

    /// Show the role connection policy
    Policy(PolicyArgs),

    /// Add or update a user
    User(UserArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    ///
    /// # Errors
    ///
    /// Returns any error from loading the repository or running the command.
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("Liaison connection graph");
            println!("Use --help for more information");
            return Ok(());
        };

        if let Commands::Init(args) = command {
            return execute::execute_init(args).await;
        }

        let app = App::from_directory(&std::env::current_dir()?).await?;
        match command {
            Commands::Init(_) => Ok(()),
            Commands::Network(args) => execute::execute_network(&app, args, output_mode).await,
            Commands::Request(args) => execute::execute_request(&app, args, output_mode).await,
            Commands::Respond(args) => execute::execute_respond(&app, args, output_mode).await,
            Commands::Withdraw(args) => execute::execute_withdraw(&app, args, output_mode).await,
            Commands::Policy(args) => execute::execute_policy(&app, args, output_mode),
            Commands::User(args) => execute::execute_user(&app, args, output_mode).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_command() {
        let cli = Cli::try_parse_from(["liaison"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_parse_global_json_flag() {
        let cli = Cli::try_parse_from(["liaison", "network", "u1", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Some(Commands::Network(_))));
    }

    #[test]
    fn test_parse_init_force() {
        let cli = Cli::try_parse_from(["liaison", "init", "--force"]).unwrap();
        match cli.command {
            Some(Commands::Init(args)) => assert!(args.force),
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_parse_network() {
        let cli =
            Cli::try_parse_from(["liaison", "network", "u1", "--viewer", "admin1", "-p"]).unwrap();
        match cli.command {
            Some(Commands::Network(args)) => {
                assert_eq!(args.subject, "u1");
                assert_eq!(args.viewer.as_deref(), Some("admin1"));
                assert!(args.pending);
            }
            _ => panic!("Expected Network command"),
        }
    }

    #[test]
    fn test_parse_request_with_note_and_tag() {
        let cli = Cli::try_parse_from([
            "liaison", "request", "u1", "u2", "--note", "Hello", "--tag", "colleague",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Request(args)) => {
                assert_eq!(args.requester, "u1");
                assert_eq!(args.target, "u2");
                assert_eq!(args.note.as_deref(), Some("Hello"));
                assert_eq!(args.tag.as_deref(), Some("colleague"));
            }
            _ => panic!("Expected Request command"),
        }
    }

    #[test]
    fn test_parse_request_rejects_long_tag() {
        let tag = "t".repeat(65);
        let result = Cli::try_parse_from(["liaison", "request", "u1", "u2", "--tag", tag.as_str()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_respond() {
        let cli = Cli::try_parse_from([
            "liaison", "respond", "conn-abc123", "--actor", "u2", "--decision", "accept",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Respond(args)) => {
                assert_eq!(args.connection, "conn-abc123");
                assert_eq!(args.decision, DecisionArg::Accept);
            }
            _ => panic!("Expected Respond command"),
        }
    }

    #[test]
    fn test_parse_respond_requires_decision() {
        let result = Cli::try_parse_from(["liaison", "respond", "conn-abc123", "--actor", "u2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_withdraw_rejects_malformed_connection_id() {
        let result = Cli::try_parse_from(["liaison", "withdraw", "issue-42", "--actor", "u1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_policy_role() {
        let cli = Cli::try_parse_from(["liaison", "policy", "--role", "headhunter"]).unwrap();
        match cli.command {
            Some(Commands::Policy(args)) => assert_eq!(args.role, Some(RoleArg::Headhunter)),
            _ => panic!("Expected Policy command"),
        }
    }

    #[test]
    fn test_parse_user() {
        let cli = Cli::try_parse_from([
            "liaison",
            "user",
            "u1",
            "--role",
            "mentor",
            "--first-name",
            "Ada",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::User(args)) => {
                assert_eq!(args.role, RoleArg::Mentor);
                assert_eq!(args.first_name.as_deref(), Some("Ada"));
                assert!(args.last_name.is_none());
            }
            _ => panic!("Expected User command"),
        }
    }

    #[test]
    fn test_parse_unknown_role_fails() {
        let result = Cli::try_parse_from(["liaison", "user", "u1", "--role", "wizard"]);
        assert!(result.is_err());
    }
}
