//! # TaskDesk CLI
//!
//! Command-line front end for the TaskDesk API. The session is persisted to
//! `~/.taskdesk/session.json` unless `--session-file` or configuration says
//! otherwise, and access tokens are refreshed transparently.
//!
//! ## Usage
//!
//! ```bash
//! taskdesk login -u alice
//! taskdesk tasks list --status todo
//! taskdesk tasks create "Write release notes" --priority high --due 2024-03-01
//! ```

mod cli;
mod commands;

use clap::Parser;
use taskdesk_client::ClientError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdesk_cli=info,taskdesk_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!("TaskDesk CLI v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(err) = commands::run_command(&cli).await {
        match err.downcast_ref::<ClientError>() {
            Some(client_err) => {
                tracing::debug!(error = %client_err, "Command failed");
                eprintln!("Error: {}", client_err.user_message());
            }
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }

    Ok(())
}
