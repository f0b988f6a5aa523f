//! awsk command line.
//!
//! Maps arguments onto resolved descriptors and runs the matching
//! [`awsk::Toolkit`] operation.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod prelude;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.global.is_verbose() {
        "awsk=debug,awsk_core=debug"
    } else {
        "awsk=info,awsk_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let toolkit = awsk::Toolkit::from_env();

    match cli.command {
        Commands::Dynamodb(command) => cli::dynamodb::run(command, &cli.global, &toolkit).await?,
        Commands::Sqs(command) => cli::sqs::run(command, &cli.global, &toolkit).await?,
    }

    Ok(())
}
