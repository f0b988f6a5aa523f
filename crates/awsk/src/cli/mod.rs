//! Command line definitions shared by every command.

pub mod dynamodb;
mod error;
pub mod sqs;

pub use error::{CliError, Result};

use awsk_core::table::Credentials;
use awsk_core::ValidationError;

/// Region used when neither `--region` nor `AWS_REGION` is given.
pub const DEFAULT_REGION: &str = "eu-central-1";

/// Bulk copy, purge and replay for DynamoDB tables and SQS queues
#[derive(Debug, clap::Parser)]
#[command(name = "awsk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: Global,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Silence the command output
    #[clap(long, global = true)]
    pub silent: bool,

    /// Enable verbose output
    #[clap(long, global = true)]
    pub verbose: bool,
}

impl Global {
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// DynamoDB table operations
    Dynamodb(dynamodb::DynamodbCommand),

    /// SQS queue operations
    Sqs(sqs::SqsCommand),
}

/// Account and region of the targeted resources.
#[derive(Debug, Clone, clap::Args)]
pub struct AwsArgs {
    /// Access key id
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true, default_value = "")]
    pub access_key_id: String,

    /// Secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true, default_value = "")]
    pub secret_access_key: String,

    /// Session token of temporary credentials
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// Region of the resources
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    pub region: String,
}

impl AwsArgs {
    pub fn credentials(&self) -> std::result::Result<Credentials, ValidationError> {
        self.side_credentials(&Side::default())
    }

    /// Region of one side of a transfer.
    pub fn side_region<'a>(&'a self, side: &Side<'a>) -> &'a str {
        side.region.unwrap_or(&self.region)
    }

    /// Credentials of one side of a transfer. Each given key overrides the
    /// shared one. The shared session token is dropped once the access key
    /// id is overridden.
    pub fn side_credentials(
        &self,
        side: &Side<'_>,
    ) -> std::result::Result<Credentials, ValidationError> {
        let access_key_id = side.access_key_id.unwrap_or(&self.access_key_id);
        let secret_access_key = side.secret_access_key.unwrap_or(&self.secret_access_key);
        let session_token = match side.access_key_id {
            Some(_) => side.session_token,
            None => side.session_token.or(self.session_token.as_deref()),
        };

        let credentials = Credentials::new(access_key_id, secret_access_key)?;
        Ok(match session_token.filter(|t| !t.is_empty()) {
            Some(token) => credentials.with_session_token(token),
            None => credentials,
        })
    }
}

/// Overrides for one side of a transfer; unset values fall back to
/// [`AwsArgs`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Side<'a> {
    pub region: Option<&'a str>,
    pub access_key_id: Option<&'a str>,
    pub secret_access_key: Option<&'a str>,
    pub session_token: Option<&'a str>,
}

/// Source side of `sync` and `replay`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SourceArgs {
    /// Region of the source (defaults to --region)
    #[arg(long)]
    pub src_region: Option<String>,

    /// Access key id of the source (defaults to --access-key-id)
    #[arg(long)]
    pub src_access_key_id: Option<String>,

    /// Secret access key of the source (defaults to --secret-access-key)
    #[arg(long)]
    pub src_secret_access_key: Option<String>,

    /// Session token of the source
    #[arg(long)]
    pub src_session_token: Option<String>,
}

impl SourceArgs {
    pub fn side(&self) -> Side<'_> {
        Side {
            region: self.src_region.as_deref(),
            access_key_id: self.src_access_key_id.as_deref(),
            secret_access_key: self.src_secret_access_key.as_deref(),
            session_token: self.src_session_token.as_deref(),
        }
    }
}

/// Destination side of `sync` and `replay`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct DestinationArgs {
    /// Region of the destination (defaults to --region)
    #[arg(long)]
    pub dest_region: Option<String>,

    /// Access key id of the destination (defaults to --access-key-id)
    #[arg(long)]
    pub dest_access_key_id: Option<String>,

    /// Secret access key of the destination (defaults to --secret-access-key)
    #[arg(long)]
    pub dest_secret_access_key: Option<String>,

    /// Session token of the destination
    #[arg(long)]
    pub dest_session_token: Option<String>,
}

impl DestinationArgs {
    pub fn side(&self) -> Side<'_> {
        Side {
            region: self.dest_region.as_deref(),
            access_key_id: self.dest_access_key_id.as_deref(),
            secret_access_key: self.dest_secret_access_key.as_deref(),
            session_token: self.dest_session_token.as_deref(),
        }
    }
}

/// Destructive commands run only when confirmed up front.
pub fn confirm(yes: bool) -> Result<()> {
    if yes {
        Ok(())
    } else {
        Err(CliError::UserCancelled)
    }
}
