//! Descriptor level operations.
//!
//! Every operation takes fully resolved descriptors, connects the adapters it
//! needs and runs the matching `awsk_core` operation with the tuning of the
//! toolkit's [`Config`].

use aws_sdk_dynamodb::Client;
use awsk_core::batch::{delete_all, BatchWriter};
use awsk_core::purge::{purge, PurgeSummary};
use awsk_core::queue::{redrive, DrainResult, ProgressCallback, QueueDescriptor};
use awsk_core::replicate::{copy_table, CopySummary, TransferOptions};
use awsk_core::scan::{scan_all, PagedSource, ScanScope};
use awsk_core::table::{
    Credentials, KeySchema, PartitionFilter, Record, SchemaSource, TableDescriptor,
};
use awsk_core::{BulkFailure, DrainFailure, Result};
use futures_util::Stream;
use tracing::info;

use crate::aws::{sdk_config, target_display};
use crate::config::Config;
use crate::dynamodb::{self, DynamoDbTable};
use crate::sqs::{ReceiveSettings, SqsConsumer, SqsProducer};

/// Entry point for the table and queue operations.
#[derive(Debug, Clone, Default)]
pub struct Toolkit {
    config: Config,
}

impl Toolkit {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Toolkit configured from the environment.
    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connects an adapter for the described table.
    pub async fn table(&self, descriptor: &TableDescriptor) -> DynamoDbTable {
        info!(
            table = descriptor.name(),
            target = %target_display(descriptor.region(), self.config.endpoint_url()),
            "Connecting to table"
        );
        DynamoDbTable::connect(descriptor, self.config.endpoint_url()).await
    }

    /// Lazily reads every page of `table`.
    pub fn scan_all<'a>(
        &self,
        table: &'a DynamoDbTable,
    ) -> impl Stream<Item = Result<Vec<Record>>> + Send + 'a {
        scan_all(table, ScanScope::Full, self.config.page_size)
    }

    /// Deletes `records` from the described table by key.
    pub async fn delete_all(
        &self,
        descriptor: &TableDescriptor,
        records: &[Record],
        schema: &KeySchema,
    ) -> std::result::Result<usize, BulkFailure> {
        let table = self.table(descriptor).await;
        delete_all(
            &table,
            records,
            schema,
            &self.config.transfer_options().batch,
        )
        .await
    }

    /// Copies every record of `source` into `destination`.
    pub async fn copy_table(
        &self,
        source: &TableDescriptor,
        destination: &TableDescriptor,
    ) -> std::result::Result<CopySummary, BulkFailure> {
        let source = self.table(source).await;
        let destination = self.table(destination).await;
        copy_table(&source, &destination, &self.config.transfer_options()).await
    }

    pub async fn get_key_schema(&self, descriptor: &TableDescriptor) -> Result<KeySchema> {
        self.table(descriptor).await.key_schema().await
    }

    /// Deletes every record of the described table, or only the records of
    /// one partition when `partition_value` is given.
    ///
    /// Without an explicit `schema` the key schema is read from the table.
    pub async fn purge_table(
        &self,
        descriptor: &TableDescriptor,
        schema: Option<KeySchema>,
        partition_value: Option<&str>,
    ) -> std::result::Result<PurgeSummary, BulkFailure> {
        let table = self.table(descriptor).await;
        purge_with(
            &table,
            schema,
            partition_value,
            &self.config.transfer_options(),
        )
        .await
    }

    /// Names of every table in `region`.
    pub async fn list_tables(&self, region: &str, credentials: &Credentials) -> Result<Vec<String>> {
        let config = sdk_config(region, credentials, self.config.endpoint_url()).await;
        dynamodb::list_tables(&Client::new(&config)).await
    }

    /// Moves every message of `source` to `destination`.
    pub async fn redrive(
        &self,
        source: &QueueDescriptor,
        destination: &QueueDescriptor,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> std::result::Result<DrainResult, DrainFailure> {
        info!(
            source = source.name(),
            destination = destination.name(),
            fifo = destination.is_fifo(),
            "Connecting to queues"
        );
        let settings = ReceiveSettings {
            wait_time_seconds: self.config.wait_time_seconds,
            visibility_timeout_seconds: self.config.visibility_timeout_seconds,
        };
        let consumer = SqsConsumer::connect(source, self.config.endpoint_url(), settings).await;
        let producer = SqsProducer::connect(destination, self.config.endpoint_url()).await;
        redrive(
            &consumer,
            &producer,
            &self.config.drain_options(),
            on_progress,
        )
        .await
    }
}

/// Resolves the key schema and partition filter, then purges `table`.
async fn purge_with<T>(
    table: &T,
    schema: Option<KeySchema>,
    partition_value: Option<&str>,
    options: &TransferOptions,
) -> std::result::Result<PurgeSummary, BulkFailure>
where
    T: PagedSource + BatchWriter + SchemaSource + ?Sized,
{
    let schema = match schema {
        Some(schema) => schema,
        None => table.key_schema().await.map_err(BulkFailure::before_start)?,
    };
    let filter = partition_value
        .map(|raw| PartitionFilter::parse(&schema, raw))
        .transpose()
        .map_err(BulkFailure::before_start)?;

    purge(table, &schema, filter.as_ref(), options).await
}
