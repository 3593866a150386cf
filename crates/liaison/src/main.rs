//! Liaison CLI binary.

use anyhow::Result;
use liaison::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the liaison CLI.
///
/// Commands are sequential and I/O-bound, so a current-thread runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Example: RUST_LOG=liaison=debug liaison network u1
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("liaison=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting liaison CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Liaison CLI completed successfully");
    Ok(())
}
