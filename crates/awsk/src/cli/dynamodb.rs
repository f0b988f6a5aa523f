//! DynamoDB table commands.

use awsk::Toolkit;
use awsk_core::table::{KeySchema, TableDescriptor};

use super::{confirm, AwsArgs, DestinationArgs, Global, Result, Side, SourceArgs};
use crate::prelude::*;

/// DynamoDB table commands.
#[derive(Debug, clap::Parser)]
pub struct DynamodbCommand {
    #[command(subcommand)]
    pub action: DynamodbAction,
}

/// Available DynamoDB actions.
#[derive(Debug, clap::Subcommand)]
pub enum DynamodbAction {
    /// List the tables of a region.
    List(ListCommand),

    /// Show the key schema of a table.
    Describe(DescribeCommand),

    /// Delete every record of a table.
    Purge(PurgeCommand),

    /// Delete every record of one partition.
    PurgePartition(PurgePartitionCommand),

    /// Copy every record of a table into another table.
    Sync(SyncCommand),
}

#[derive(Debug, clap::Parser)]
pub struct ListCommand {
    #[command(flatten)]
    pub aws: AwsArgs,
}

#[derive(Debug, clap::Parser)]
pub struct DescribeCommand {
    /// Table name.
    pub table_name: String,

    #[command(flatten)]
    pub aws: AwsArgs,
}

#[derive(Debug, clap::Parser)]
#[command(long_about = "Delete every record of a table.

The key schema is read with DescribeTable unless --key-schema is given as a
JSON object of attribute names to types, partition key first, for example
'{\"id\":\"S\",\"createdAt\":\"N\"}'.

There is no interactive prompt: --yes is mandatory, without it the command
exits before connecting.")]
pub struct PurgeCommand {
    /// Table name.
    pub table_name: String,

    /// Key schema as JSON, instead of reading it from the table.
    #[arg(long, value_name = "JSON")]
    pub key_schema: Option<String>,

    /// Confirm the deletion.
    #[arg(long, alias = "force")]
    pub yes: bool,

    #[command(flatten)]
    pub aws: AwsArgs,
}

#[derive(Debug, clap::Parser)]
#[command(long_about = "Delete every record of one partition of a table.

The partition value is parsed against the type of the partition key. Binary
keys are given as base64.

There is no interactive prompt: --yes is mandatory, without it the command
exits before connecting.")]
pub struct PurgePartitionCommand {
    /// Table name.
    pub table_name: String,

    /// Partition key value. Binary keys are given as base64.
    pub partition_value: String,

    /// Key schema as JSON, instead of reading it from the table.
    #[arg(long, value_name = "JSON")]
    pub key_schema: Option<String>,

    /// Confirm the deletion.
    #[arg(long, alias = "force")]
    pub yes: bool,

    #[command(flatten)]
    pub aws: AwsArgs,
}

#[derive(Debug, clap::Parser)]
pub struct SyncCommand {
    /// Table to read from.
    pub source: String,

    /// Table to write into.
    pub destination: String,

    #[command(flatten)]
    pub src: SourceArgs,

    #[command(flatten)]
    pub dest: DestinationArgs,

    #[command(flatten)]
    pub aws: AwsArgs,
}

/// Main entry point for the dynamodb command.
pub async fn run(command: DynamodbCommand, global: &Global, toolkit: &Toolkit) -> Result<()> {
    match command.action {
        DynamodbAction::List(cmd) => run_list(cmd, global, toolkit).await,
        DynamodbAction::Describe(cmd) => run_describe(cmd, global, toolkit).await,
        DynamodbAction::Purge(cmd) => {
            confirm(cmd.yes)?;
            let descriptor = table_descriptor(&cmd.table_name, &Side::default(), &cmd.aws)?;
            run_purge(&descriptor, cmd.key_schema.as_deref(), None, global, toolkit).await
        }
        DynamodbAction::PurgePartition(cmd) => {
            confirm(cmd.yes)?;
            let descriptor = table_descriptor(&cmd.table_name, &Side::default(), &cmd.aws)?;
            run_purge(
                &descriptor,
                cmd.key_schema.as_deref(),
                Some(cmd.partition_value.as_str()),
                global,
                toolkit,
            )
            .await
        }
        DynamodbAction::Sync(cmd) => run_sync(cmd, global, toolkit).await,
    }
}

fn table_descriptor(name: &str, side: &Side<'_>, aws: &AwsArgs) -> Result<TableDescriptor> {
    Ok(TableDescriptor::new(
        name,
        aws.side_region(side),
        aws.side_credentials(side)?,
    )?)
}

async fn run_list(cmd: ListCommand, global: &Global, toolkit: &Toolkit) -> Result<()> {
    let credentials = cmd.aws.credentials()?;
    let tables = toolkit.list_tables(&cmd.aws.region, &credentials).await?;

    if !global.is_silent() {
        if tables.is_empty() {
            aprintln!("{}", p_y("No tables found."));
        }
        for table in &tables {
            aprintln!("{table}");
        }
    }
    Ok(())
}

async fn run_describe(cmd: DescribeCommand, global: &Global, toolkit: &Toolkit) -> Result<()> {
    let descriptor = table_descriptor(&cmd.table_name, &Side::default(), &cmd.aws)?;
    let schema = toolkit.get_key_schema(&descriptor).await?;

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Table:"), descriptor.name());
        aprintln!("{} {}", p_b("Key schema:"), schema);
    }
    Ok(())
}

async fn run_purge(
    descriptor: &TableDescriptor,
    key_schema: Option<&str>,
    partition_value: Option<&str>,
    global: &Global,
    toolkit: &Toolkit,
) -> Result<()> {
    let schema = key_schema.map(KeySchema::from_json).transpose()?;

    if !global.is_silent() {
        match partition_value {
            Some(value) => aprintln!(
                "{} {} (partition {})",
                p_b("Purging:"),
                descriptor.name(),
                value
            ),
            None => aprintln!("{} {}", p_b("Purging:"), descriptor.name()),
        }
    }

    let summary = toolkit
        .purge_table(descriptor, schema, partition_value)
        .await?;

    if !global.is_silent() {
        if summary.is_noop() {
            aprintln!("{}", p_y("No entries found."));
        } else {
            aprintln!("{} {} records", p_g("Deleted"), summary.deleted);
        }
    }
    Ok(())
}

async fn run_sync(cmd: SyncCommand, global: &Global, toolkit: &Toolkit) -> Result<()> {
    let source = table_descriptor(&cmd.source, &cmd.src.side(), &cmd.aws)?;
    let destination = table_descriptor(&cmd.destination, &cmd.dest.side(), &cmd.aws)?;

    if !global.is_silent() {
        aprintln!(
            "{} {} ({}) -> {} ({})",
            p_b("Copying:"),
            source.name(),
            source.region(),
            destination.name(),
            destination.region()
        );
    }

    let summary = toolkit.copy_table(&source, &destination).await?;

    if !global.is_silent() {
        aprintln!(
            "{} {} of {} records",
            p_g("Copied"),
            summary.copied,
            summary.scanned
        );
    }
    Ok(())
}
