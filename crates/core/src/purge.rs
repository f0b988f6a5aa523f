//! Table purge: delete every record, or every record of one partition.

use futures_util::stream::TryStreamExt;
use tracing::info;

use crate::batch::{apply_batches, BatchWriter, WriteRequest};
use crate::error::{BulkFailure, CoreError, ValidationError};
use crate::replicate::TransferOptions;
use crate::scan::{scan_all, PagedSource, ScanScope};
use crate::table::{extract_key, KeySchema, PartitionFilter};

/// Outcome of a finished purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeSummary {
    pub deleted: usize,
}

impl PurgeSummary {
    /// True when the scan found nothing to delete.
    pub fn is_noop(&self) -> bool {
        self.deleted == 0
    }
}

/// Deletes the records of `table`, optionally only those matching
/// `partition`.
///
/// The scan runs to completion and every key is extracted before the first
/// delete. Deletion is at-least-once: re-running recomputes the current
/// record set, and an empty table is a successful no-op.
pub async fn purge<T>(
    table: &T,
    schema: &KeySchema,
    partition: Option<&PartitionFilter>,
    options: &TransferOptions,
) -> Result<PurgeSummary, BulkFailure>
where
    T: PagedSource + BatchWriter + ?Sized,
{
    let scope = match partition {
        Some(filter) => {
            if filter.attribute() != schema.partition_key().name {
                return Err(BulkFailure::before_start(
                    ValidationError::InvalidPartitionValue {
                        attribute: filter.attribute().to_string(),
                        reason: "not the partition key of this table".to_string(),
                    },
                ));
            }
            info!(partition_key = filter.attribute(), "Purging partition");
            ScanScope::Partition(filter.clone())
        }
        None => {
            info!("Purging table");
            ScanScope::Full
        }
    };

    let requests = scan_all(table, scope, options.page_size.get())
        .try_fold(Vec::new(), |mut requests, page| async move {
            for record in &page {
                let key = extract_key(record, schema).map_err(CoreError::from)?;
                requests.push(WriteRequest::Delete(key));
            }
            Ok(requests)
        })
        .await
        .map_err(BulkFailure::before_start)?;

    if requests.is_empty() {
        info!("No entries found");
        return Ok(PurgeSummary { deleted: 0 });
    }

    info!(records = requests.len(), "Deleting records");
    let deleted = apply_batches(table, requests, &options.batch).await?;
    info!(deleted, "Purge complete");

    Ok(PurgeSummary { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTable;
    use crate::table::{AttributeValue, KeyAttribute, KeyAttributeType, Record};

    fn schema() -> KeySchema {
        KeySchema::from_json(r#"{"tenant":"S","seq":"N"}"#).unwrap()
    }

    fn record(tenant: &str, seq: usize) -> Record {
        Record::from([
            ("tenant".to_string(), AttributeValue::S(tenant.to_string())),
            ("seq".to_string(), AttributeValue::N(seq.to_string())),
            ("body".to_string(), AttributeValue::S("payload".to_string())),
        ])
    }

    fn table_with(tenants: &[(&str, usize)]) -> MemoryTable {
        let records = tenants
            .iter()
            .flat_map(|(tenant, count)| (0..*count).map(move |i| record(tenant, i)))
            .collect();
        MemoryTable::new(schema()).with_records(records)
    }

    #[tokio::test]
    async fn test_purge_deletes_everything() {
        let table = table_with(&[("a", 40), ("b", 20)]);

        let summary = purge(&table, &schema(), None, &TransferOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.deleted, 60);
        assert!(table.is_empty());
        let mut sizes = table.batch_sizes();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(sizes, vec![25, 25, 10]);
    }

    #[tokio::test]
    async fn test_purge_twice_is_idempotent() {
        let table = table_with(&[("a", 3)]);

        let first = purge(&table, &schema(), None, &TransferOptions::default())
            .await
            .unwrap();
        let second = purge(&table, &schema(), None, &TransferOptions::default())
            .await
            .unwrap();

        assert_eq!(first.deleted, 3);
        assert_eq!(second.deleted, 0);
        assert!(second.is_noop());
    }

    #[tokio::test]
    async fn test_purge_empty_table_is_noop() {
        let table = MemoryTable::new(schema());

        let summary = purge(&table, &schema(), None, &TransferOptions::default())
            .await
            .unwrap();

        assert!(summary.is_noop());
        assert!(table.batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_purge_partition_keeps_other_partitions() {
        let table = table_with(&[("a", 30), ("b", 12)]);
        let filter = PartitionFilter::parse(&schema(), "b").unwrap();

        let summary = purge(&table, &schema(), Some(&filter), &TransferOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.deleted, 12);
        assert_eq!(table.len(), 30);
    }

    #[tokio::test]
    async fn test_purge_rejects_filter_on_other_attribute() {
        let table = table_with(&[("a", 1)]);
        let other = KeySchema::new(KeyAttribute::new("seq", KeyAttributeType::Number), None)
            .unwrap();
        let filter = PartitionFilter::parse(&other, "1").unwrap();

        let failure = purge(&table, &schema(), Some(&filter), &TransferOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            CoreError::Validation(ValidationError::InvalidPartitionValue { .. })
        ));
        assert_eq!(table.scan_calls(), 0);
    }

    #[tokio::test]
    async fn test_purge_missing_key_deletes_nothing() {
        let mut broken = record("a", 99);
        broken.remove("seq");
        let mut records: Vec<Record> = (0..5).map(|i| record("a", i)).collect();
        records.push(broken);
        let table = MemoryTable::new(schema()).with_records(records);

        let failure = purge(&table, &schema(), None, &TransferOptions::default())
            .await
            .unwrap_err();

        assert_eq!(failure.processed, 0);
        assert!(table.batch_sizes().is_empty());
    }
}
