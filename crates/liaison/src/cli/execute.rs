//! Command execution logic.

use anyhow::Result;

use super::args::{
    InitArgs, NetworkArgs, PolicyArgs, RequestArgs, RespondArgs, UserArgs, WithdrawArgs,
};
use crate::app::App;
use crate::domain::{ConnectionId, Profile, Role, User, UserId};
use crate::lifecycle::ConnectionRequest;
use crate::output::{self, OutputMode};

/// Execute the init command
pub async fn execute_init(args: &InitArgs) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;
    let result = init::init(&current_dir, args.force).await?;

    if !args.quiet {
        let verb = if result.reinitialized {
            "Reinitialized"
        } else {
            "Initialized"
        };
        println!("{verb} liaison in {}", result.liaison_dir.display());
        println!("  Config:      {}", result.config_file.display());
        println!("  Users:       {}", result.users_file.display());
        println!("  Connections: {}", result.connections_file.display());
    }

    Ok(())
}

/// Execute the network command
pub async fn execute_network(app: &App, args: &NetworkArgs, output_mode: OutputMode) -> Result<()> {
    let subject = UserId::new(args.subject.as_str());
    let viewer = args
        .viewer
        .as_deref()
        .map_or_else(|| subject.clone(), UserId::new);

    let payload = app
        .network()
        .build_connection_network(&subject, &viewer, args.pending)
        .await?;

    output::print_network(&payload, output_mode)?;
    Ok(())
}

/// Execute the request command
pub async fn execute_request(app: &App, args: &RequestArgs, output_mode: OutputMode) -> Result<()> {
    let mut request = ConnectionRequest::new(args.requester.as_str(), args.target.as_str());
    request.note.clone_from(&args.note);
    request.relationship_tag.clone_from(&args.tag);

    let connection = app.lifecycle().request(request).await?;
    app.save().await?;

    output::print_connection(&connection, output_mode)?;
    Ok(())
}

/// Execute the respond command
pub async fn execute_respond(app: &App, args: &RespondArgs, output_mode: OutputMode) -> Result<()> {
    let receipt = app
        .lifecycle()
        .respond(
            &ConnectionId::new(args.connection.as_str()),
            &UserId::new(args.actor.as_str()),
            args.decision.into(),
        )
        .await?;
    app.save().await?;

    output::print_receipt(&receipt, output_mode)?;
    Ok(())
}

/// Execute the withdraw command
pub async fn execute_withdraw(
    app: &App,
    args: &WithdrawArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let receipt = app
        .lifecycle()
        .withdraw(
            &ConnectionId::new(args.connection.as_str()),
            &UserId::new(args.actor.as_str()),
        )
        .await?;
    app.save().await?;

    output::print_receipt(&receipt, output_mode)?;
    Ok(())
}

/// Execute the policy command
pub fn execute_policy(app: &App, args: &PolicyArgs, output_mode: OutputMode) -> Result<()> {
    let mut matrix = app.policy().snapshot();
    if let Some(role) = args.role {
        let role = Role::from(role);
        matrix.retain(|r, _| *r == role);
    }

    output::print_policy(&matrix, output_mode)?;
    Ok(())
}

/// Execute the user command
pub async fn execute_user(app: &App, args: &UserArgs, output_mode: OutputMode) -> Result<()> {
    let id = UserId::new(args.id.as_str());

    // Keep profile fields this command does not set
    let existing = app.store().get_user(&id).await?;
    let mut user = existing.unwrap_or_else(|| User::new(id, args.role.into()));

    user.role = args.role.into();
    if args.first_name.is_some() {
        user.first_name.clone_from(&args.first_name);
    }
    if args.last_name.is_some() {
        user.last_name.clone_from(&args.last_name);
    }
    if args.email.is_some() {
        user.email.clone_from(&args.email);
    }
    if let Some(headline) = &args.headline {
        user.profile.get_or_insert_with(Profile::default).headline = Some(headline.clone());
    }

    app.store().upsert_user(user.clone()).await?;
    app.save().await?;

    output::print_user(&user, output_mode)?;
    Ok(())
}
