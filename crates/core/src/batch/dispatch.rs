use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::stream::{self, TryStreamExt};
use tracing::{debug, warn};

use super::chunk::chunk;
use super::writer::{BatchWriter, WriteRequest, MAX_BATCH_SIZE};
use crate::error::{BulkFailure, CoreError, Result};
use crate::table::{extract_key, KeySchema, Record};

/// Bulk calls allowed in flight at once for one logical operation.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Sizing of bulk calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Requests per bulk call, at most [`MAX_BATCH_SIZE`].
    pub batch_size: NonZeroUsize,
    /// Bulk calls in flight at once.
    pub concurrency: NonZeroUsize,
}

impl BatchOptions {
    /// Builds options, clamping the batch size to `1..=MAX_BATCH_SIZE` and the
    /// concurrency to at least one.
    pub fn new(batch_size: usize, concurrency: usize) -> Self {
        Self {
            batch_size: NonZeroUsize::new(batch_size.clamp(1, MAX_BATCH_SIZE))
                .unwrap_or(NonZeroUsize::MIN),
            concurrency: NonZeroUsize::new(concurrency).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::new(MAX_BATCH_SIZE, DEFAULT_BATCH_CONCURRENCY)
    }
}

/// Chunks `requests` and sends every chunk, at most `options.concurrency` at
/// a time and in no particular order.
///
/// The first failing chunk aborts the operation; chunks still in flight are
/// dropped. Returns the number of applied requests.
pub async fn apply_batches<W>(
    writer: &W,
    requests: Vec<WriteRequest>,
    options: &BatchOptions,
) -> std::result::Result<usize, BulkFailure>
where
    W: BatchWriter + ?Sized,
{
    if requests.is_empty() {
        return Ok(0);
    }

    let processed = AtomicUsize::new(0);
    let batches = chunk(requests, options.batch_size);
    debug!(
        batches = batches.len(),
        concurrency = options.concurrency.get(),
        "Dispatching bulk calls"
    );

    stream::iter(batches.into_iter().map(Ok::<_, CoreError>))
        .try_for_each_concurrent(options.concurrency.get(), |batch| {
            dispatch_batch(writer, batch, &processed)
        })
        .await
        .map_err(|error| BulkFailure {
            processed: processed.load(Ordering::SeqCst),
            error,
        })?;

    Ok(processed.into_inner())
}

/// Sends one chunk and adds the applied requests to `processed`.
///
/// Unprocessed requests in the acknowledgement are a `PartialBatchFailure`.
pub(crate) async fn dispatch_batch<W>(
    writer: &W,
    batch: Vec<WriteRequest>,
    processed: &AtomicUsize,
) -> Result<()>
where
    W: BatchWriter + ?Sized,
{
    let attempted = batch.len();
    let outcome = writer.write_batch(batch).await?;
    let applied = attempted.saturating_sub(outcome.unprocessed.len());
    processed.fetch_add(applied, Ordering::SeqCst);

    if outcome.is_complete() {
        debug!(batch_size = attempted, "Bulk call acknowledged");
        return Ok(());
    }

    warn!(
        batch_size = attempted,
        unprocessed = outcome.unprocessed.len(),
        "Bulk call left items unprocessed"
    );
    Err(CoreError::PartialBatchFailure {
        attempted,
        unprocessed: outcome.unprocessed,
    })
}

/// Deletes `records` by key.
///
/// Every key is extracted before the first call, so a record missing a key
/// attribute fails the operation without deleting anything.
pub async fn delete_all<W>(
    writer: &W,
    records: &[Record],
    schema: &KeySchema,
    options: &BatchOptions,
) -> std::result::Result<usize, BulkFailure>
where
    W: BatchWriter + ?Sized,
{
    let requests = records
        .iter()
        .map(|record| extract_key(record, schema).map(WriteRequest::Delete))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(BulkFailure::before_start)?;

    apply_batches(writer, requests, options).await
}

/// Writes full `records`, replacing rows with the same key.
pub async fn put_all<W>(
    writer: &W,
    records: Vec<Record>,
    options: &BatchOptions,
) -> std::result::Result<usize, BulkFailure>
where
    W: BatchWriter + ?Sized,
{
    let requests = records.into_iter().map(WriteRequest::Put).collect();
    apply_batches(writer, requests, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTable;
    use crate::table::AttributeValue;
    use crate::ValidationError;

    fn schema() -> KeySchema {
        KeySchema::from_json(r#"{"id":"S"}"#).unwrap()
    }

    fn record(i: usize) -> Record {
        Record::from([
            ("id".to_string(), AttributeValue::S(format!("item-{i:03}"))),
            ("n".to_string(), AttributeValue::N(i.to_string())),
        ])
    }

    fn records(count: usize) -> Vec<Record> {
        (0..count).map(record).collect()
    }

    #[test]
    fn test_options_clamp() {
        let options = BatchOptions::new(100, 0);
        assert_eq!(options.batch_size.get(), MAX_BATCH_SIZE);
        assert_eq!(options.concurrency.get(), 1);

        let options = BatchOptions::new(0, 8);
        assert_eq!(options.batch_size.get(), 1);
        assert_eq!(options.concurrency.get(), 8);
    }

    #[tokio::test]
    async fn test_delete_all_sixty_items_issues_three_calls() {
        let table = MemoryTable::new(schema()).with_records(records(60));

        let deleted = delete_all(&table, &records(60), &schema(), &BatchOptions::default())
            .await
            .unwrap();

        assert_eq!(deleted, 60);
        let mut sizes = table.batch_sizes();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(sizes, vec![25, 25, 10]);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_empty_input_makes_no_calls() {
        let table = MemoryTable::new(schema());

        let deleted = delete_all(&table, &[], &schema(), &BatchOptions::default())
            .await
            .unwrap();

        assert_eq!(deleted, 0);
        assert!(table.batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_missing_key_fails_before_any_call() {
        let table = MemoryTable::new(schema()).with_records(records(3));
        let mut input = records(3);
        input[1].remove("id");

        let failure = delete_all(&table, &input, &schema(), &BatchOptions::default())
            .await
            .unwrap_err();

        assert_eq!(failure.processed, 0);
        assert_eq!(
            failure.error,
            CoreError::Validation(ValidationError::MissingKeyAttribute {
                attribute: "id".to_string()
            })
        );
        assert!(table.batch_sizes().is_empty());
        assert_eq!(table.len(), 3);
    }

    #[tokio::test]
    async fn test_partial_batch_failure_is_escalated() {
        let table = MemoryTable::new(schema()).with_unprocessed_per_batch(2);

        let failure = put_all(&table, records(10), &BatchOptions::default())
            .await
            .unwrap_err();

        match failure.error {
            CoreError::PartialBatchFailure {
                attempted,
                unprocessed,
            } => {
                assert_eq!(attempted, 10);
                assert_eq!(unprocessed.len(), 2);
            }
            other => panic!("expected partial batch failure, got {other:?}"),
        }
        assert_eq!(failure.processed, 8);
    }

    #[tokio::test]
    async fn test_transport_failure_reports_processed_count() {
        let options = BatchOptions::new(25, 1);
        let table = MemoryTable::new(schema()).with_failing_batch(2);

        let failure = put_all(&table, records(60), &options).await.unwrap_err();

        assert!(matches!(failure.error, CoreError::Transport { .. }));
        assert_eq!(failure.processed, 25);
        assert_eq!(table.len(), 25);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let options = BatchOptions::new(5, 3);
        let table = MemoryTable::new(schema()).with_write_delay(std::time::Duration::from_millis(5));

        let written = put_all(&table, records(50), &options).await.unwrap();

        assert_eq!(written, 50);
        assert_eq!(table.batch_sizes().len(), 10);
        assert!(table.max_in_flight() <= 3);
        assert!(table.max_in_flight() >= 1);
    }
}
