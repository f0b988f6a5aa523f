//! Table replication: scan one table and write every record into another.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::stream::{self, TryStreamExt};
use tracing::info;

use crate::batch::{chunk, dispatch_batch, BatchOptions, BatchWriter, WriteRequest};
use crate::error::{BulkFailure, CoreError};
use crate::scan::{scan_all, PagedSource, ScanScope, DEFAULT_PAGE_SIZE};

/// Page and batch sizing of a table transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub page_size: NonZeroUsize,
    pub batch: BatchOptions,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            page_size: NonZeroUsize::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroUsize::MIN),
            batch: BatchOptions::default(),
        }
    }
}

/// Outcome of a finished copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopySummary {
    pub scanned: usize,
    pub copied: usize,
}

/// Copies every record of `source` into `destination`.
///
/// Pages are read sequentially while their batches are written with bounded
/// concurrency; the copy completes once the scan is exhausted and every write
/// has been acknowledged. A full copy is only guaranteed when `source` is not
/// mutated meanwhile. Re-running after a failure copies everything again.
pub async fn copy_table<S, D>(
    source: &S,
    destination: &D,
    options: &TransferOptions,
) -> Result<CopySummary, BulkFailure>
where
    S: PagedSource + ?Sized,
    D: BatchWriter + ?Sized,
{
    let scanned = AtomicUsize::new(0);
    let copied = AtomicUsize::new(0);
    let batch_size = options.batch.batch_size;

    info!("Copying table");

    let scanned_ref = &scanned;
    let copied_ref = &copied;
    scan_all(source, ScanScope::Full, options.page_size.get())
        .map_ok(|records| {
            scanned_ref.fetch_add(records.len(), Ordering::SeqCst);
            let requests = records.into_iter().map(WriteRequest::Put).collect();
            stream::iter(chunk(requests, batch_size).into_iter().map(Ok::<_, CoreError>))
        })
        .try_flatten()
        .try_for_each_concurrent(options.batch.concurrency.get(), |batch| async move {
            dispatch_batch(destination, batch, copied_ref).await
        })
        .await
        .map_err(|error| BulkFailure {
            processed: copied.load(Ordering::SeqCst),
            error,
        })?;

    let summary = CopySummary {
        scanned: scanned.into_inner(),
        copied: copied.into_inner(),
    };
    info!(
        scanned = summary.scanned,
        copied = summary.copied,
        "Table copy complete"
    );
    Ok(summary)
}
