//! SQS queue commands.

use std::sync::atomic::{AtomicU64, Ordering};

use awsk::Toolkit;
use awsk_core::queue::{ProgressCallback, QueueDescriptor};

use super::{confirm, AwsArgs, DestinationArgs, Global, Result, Side, SourceArgs};
use crate::prelude::*;

/// SQS queue commands.
#[derive(Debug, clap::Parser)]
pub struct SqsCommand {
    #[command(subcommand)]
    pub action: SqsAction,
}

/// Available SQS actions.
#[derive(Debug, clap::Subcommand)]
pub enum SqsAction {
    /// Move every message of a queue into another queue.
    Replay(ReplayCommand),
}

#[derive(Debug, clap::Parser)]
#[command(long_about = "Move every message of a queue into another queue.

Messages are received from the source queue, sent to the destination queue
and only then deleted from the source. The command ends once the source queue
is empty. FIFO destinations (names ending in .fifo) receive the group id
're-drive' and a fresh deduplication id per message.

Each side can use its own account with --src-access-key-id and
--dest-access-key-id (plus the matching secret keys).

There is no interactive prompt: --yes is mandatory, without it the command
exits before connecting.")]
pub struct ReplayCommand {
    /// Queue URL to read from, usually a dead letter queue.
    pub source: String,

    /// Queue URL to send to.
    pub destination: String,

    #[command(flatten)]
    pub src: SourceArgs,

    #[command(flatten)]
    pub dest: DestinationArgs,

    /// Confirm the replay.
    #[arg(long, alias = "force")]
    pub yes: bool,

    #[command(flatten)]
    pub aws: AwsArgs,
}

/// Main entry point for the sqs command.
pub async fn run(command: SqsCommand, global: &Global, toolkit: &Toolkit) -> Result<()> {
    match command.action {
        SqsAction::Replay(cmd) => {
            confirm(cmd.yes)?;
            run_replay(cmd, global, toolkit).await
        }
    }
}

fn queue_descriptor(url: &str, side: &Side<'_>, aws: &AwsArgs) -> Result<QueueDescriptor> {
    Ok(QueueDescriptor::new(
        url,
        aws.side_region(side),
        aws.side_credentials(side)?,
    )?)
}

async fn run_replay(cmd: ReplayCommand, global: &Global, toolkit: &Toolkit) -> Result<()> {
    let source = queue_descriptor(&cmd.source, &cmd.src.side(), &cmd.aws)?;
    let destination = queue_descriptor(&cmd.destination, &cmd.dest.side(), &cmd.aws)?;

    let silent = global.is_silent();
    if !silent {
        aprintln!(
            "{} {} -> {}",
            p_b("Replaying:"),
            source.name(),
            destination.name()
        );
    }

    let seen = AtomicU64::new(0);
    let print_progress = |message_id: &str| {
        let count = seen.fetch_add(1, Ordering::SeqCst) + 1;
        if !silent {
            aprintln!("  {} {}", p_g(&format!("[{count}]")), message_id);
        }
    };

    let progress: ProgressCallback<'_> = &print_progress;

    match toolkit.redrive(&source, &destination, Some(progress)).await {
        Ok(result) => {
            if !silent {
                aprintln!("{} {} messages", p_g("Replayed"), result.count);
            }
            Ok(())
        }
        Err(failure) => {
            if !silent {
                aprintln!(
                    "{} after {} messages",
                    p_r("Replay failed"),
                    failure.forwarded
                );
            }
            Err(failure.into())
        }
    }
}
