//! DynamoDB table adapter.
//!
//! Implements the `awsk_core` provider traits for one table.

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use awsk_core::batch::{BatchOutcome, BatchWriter, WriteRequest};
use awsk_core::scan::{PageRequest, PagedSource, ScanPage, ScanScope};
use awsk_core::table::{KeySchema, SchemaSource, TableDescriptor};
use awsk_core::{CoreError, Result};
use tracing::debug;

use super::conversions::{
    cursor_to_item, from_sdk_write_request, item_to_cursor, item_to_record,
    key_schema_from_description, to_sdk_value, to_sdk_write_request, Item,
};
use super::error::{
    map_batch_write_error, map_describe_table_error, map_list_tables_error, map_query_error,
    map_scan_error,
};
use crate::aws::sdk_config;

/// One DynamoDB table, read with Scan/Query and written with BatchWriteItem.
#[derive(Debug, Clone)]
pub struct DynamoDbTable {
    client: Client,
    table_name: String,
}

impl DynamoDbTable {
    /// Creates a table adapter with the given client and table name.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Creates a client for the descriptor's region and credentials.
    pub async fn connect(descriptor: &TableDescriptor, endpoint_url: Option<&str>) -> Self {
        let config = sdk_config(descriptor.region(), descriptor.credentials(), endpoint_url).await;
        Self::new(Client::new(&config), descriptor.name())
    }

    async fn scan(&self, limit: i32, start: Option<Item>) -> Result<(Vec<Item>, Option<Item>)> {
        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .limit(limit)
            .set_exclusive_start_key(start)
            .send()
            .await
            .map_err(|e| map_scan_error(e, &self.table_name))?;

        Ok((output.items.unwrap_or_default(), output.last_evaluated_key))
    }

    async fn query(
        &self,
        attribute: &str,
        value: Item,
        limit: i32,
        start: Option<Item>,
    ) -> Result<(Vec<Item>, Option<Item>)> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("#pk = :pk")
            .expression_attribute_names("#pk", attribute)
            .set_expression_attribute_values(Some(value))
            .limit(limit)
            .set_exclusive_start_key(start)
            .send()
            .await
            .map_err(|e| map_query_error(e, &self.table_name))?;

        Ok((output.items.unwrap_or_default(), output.last_evaluated_key))
    }
}

#[async_trait]
impl PagedSource for DynamoDbTable {
    async fn scan_page(&self, request: &PageRequest) -> Result<ScanPage> {
        let limit = i32::try_from(request.limit).unwrap_or(i32::MAX);
        let start = request.cursor.as_ref().map(cursor_to_item);

        let (items, last_evaluated_key) = match &request.scope {
            ScanScope::Full => self.scan(limit, start).await?,
            ScanScope::Partition(filter) => {
                let value = Item::from([(":pk".to_string(), to_sdk_value(filter.value()))]);
                self.query(filter.attribute(), value, limit, start).await?
            }
        };

        let records = items.iter().map(item_to_record).collect::<Result<Vec<_>>>()?;
        let next = item_to_cursor(last_evaluated_key.as_ref())?;
        debug!(
            table = %self.table_name,
            records = records.len(),
            has_more = next.is_some(),
            "Fetched page"
        );

        Ok(ScanPage { records, next })
    }
}

#[async_trait]
impl BatchWriter for DynamoDbTable {
    async fn write_batch(&self, batch: Vec<WriteRequest>) -> Result<BatchOutcome> {
        let requests = batch
            .iter()
            .map(to_sdk_write_request)
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(&self.table_name, requests)
            .send()
            .await
            .map_err(|e| map_batch_write_error(e, &self.table_name))?;

        let unprocessed = output
            .unprocessed_items
            .as_ref()
            .and_then(|items| items.get(&self.table_name))
            .map(|requests| {
                requests
                    .iter()
                    .map(from_sdk_write_request)
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(BatchOutcome { unprocessed })
    }
}

#[async_trait]
impl SchemaSource for DynamoDbTable {
    async fn key_schema(&self) -> Result<KeySchema> {
        let output = self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| map_describe_table_error(e, &self.table_name))?;

        let table = output.table().ok_or_else(|| {
            CoreError::transport("DescribeTable", "response has no table description")
        })?;

        Ok(key_schema_from_description(
            table.key_schema(),
            table.attribute_definitions(),
        )?)
    }
}

/// Lists every table name reachable with `client`, following pagination.
pub async fn list_tables(client: &Client) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut start: Option<String> = None;

    loop {
        let output = client
            .list_tables()
            .set_exclusive_start_table_name(start.take())
            .send()
            .await
            .map_err(map_list_tables_error)?;

        names.extend(output.table_names().iter().cloned());

        match output.last_evaluated_table_name() {
            Some(last) => start = Some(last.to_string()),
            None => break,
        }
    }

    Ok(names)
}
