//! Paginated table reads.
//!
//! A scan is a lazy, non-restartable stream of record pages. Pages are
//! fetched strictly one after another because each request carries the
//! cursor returned by the previous page.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::stream::{Stream, TryStreamExt};
use tracing::debug;

use crate::error::Result;
use crate::table::{AttributeValue, PartitionFilter, Record};

/// Records per page when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Opaque continuation marker returned by a page that has more to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor(HashMap<String, AttributeValue>);

impl ScanCursor {
    pub fn new(position: HashMap<String, AttributeValue>) -> Self {
        Self(position)
    }

    pub fn position(&self) -> &HashMap<String, AttributeValue> {
        &self.0
    }
}

/// Which records a scan covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanScope {
    #[default]
    Full,
    /// Only records whose partition key equals the filter value.
    Partition(PartitionFilter),
}

/// Request for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub scope: ScanScope,
    pub limit: usize,
    pub cursor: Option<ScanCursor>,
}

/// One page of records and the cursor of the next page, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanPage {
    pub records: Vec<Record>,
    pub next: Option<ScanCursor>,
}

/// A table that can be read page by page.
#[async_trait]
pub trait PagedSource: Send + Sync {
    /// Fetches the page described by `request`.
    async fn scan_page(&self, request: &PageRequest) -> Result<ScanPage>;
}

/// Reads `source` to exhaustion, yielding one item per page.
///
/// The first failing page ends the stream with that error; nothing after it
/// is fetched.
pub fn scan_all<'a, P>(
    source: &'a P,
    scope: ScanScope,
    page_size: usize,
) -> impl Stream<Item = Result<Vec<Record>>> + Send + 'a
where
    P: PagedSource + ?Sized,
{
    async_stream::try_stream! {
        let mut request = PageRequest {
            scope,
            limit: page_size.max(1),
            cursor: None,
        };
        let mut pages = 0usize;
        loop {
            let page = source.scan_page(&request).await?;
            pages += 1;
            debug!(
                page = pages,
                records = page.records.len(),
                has_more = page.next.is_some(),
                "Scanned page"
            );
            let next = page.next;
            yield page.records;
            match next {
                Some(cursor) => request.cursor = Some(cursor),
                None => break,
            }
        }
    }
}

/// Reads every page of `source` into one vector, in page order.
pub async fn collect_all<P>(source: &P, scope: ScanScope, page_size: usize) -> Result<Vec<Record>>
where
    P: PagedSource + ?Sized,
{
    scan_all(source, scope, page_size)
        .try_fold(Vec::new(), |mut records, page| async move {
            records.extend(page);
            Ok(records)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::memory::MemoryTable;
    use crate::table::KeySchema;
    use futures_util::StreamExt;

    fn schema() -> KeySchema {
        KeySchema::from_json(r#"{"pk":"S","sk":"N"}"#).unwrap()
    }

    fn record(pk: &str, sk: usize) -> Record {
        Record::from([
            ("pk".to_string(), AttributeValue::S(pk.to_string())),
            ("sk".to_string(), AttributeValue::N(sk.to_string())),
        ])
    }

    fn sixty() -> Vec<Record> {
        (0..60).map(|i| record("p", i)).collect()
    }

    #[tokio::test]
    async fn test_scan_all_pages_of_25_25_10() {
        let table = MemoryTable::new(schema()).with_records(sixty());

        let pages: Vec<Vec<Record>> = scan_all(&table, ScanScope::Full, 25)
            .try_collect()
            .await
            .unwrap();

        let sizes: Vec<usize> = pages.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![25, 25, 10]);
        assert_eq!(pages.concat(), sixty());
        assert_eq!(table.scan_calls(), 3);
    }

    #[tokio::test]
    async fn test_collect_all_preserves_page_order() {
        let table = MemoryTable::new(schema()).with_records(sixty());

        let records = collect_all(&table, ScanScope::Full, 25).await.unwrap();

        assert_eq!(records.len(), 60);
        assert_eq!(records, sixty());
    }

    #[tokio::test]
    async fn test_scan_empty_table_yields_one_empty_page() {
        let table = MemoryTable::new(schema());

        let pages: Vec<Vec<Record>> = scan_all(&table, ScanScope::Full, 25)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(pages, vec![Vec::<Record>::new()]);
    }

    #[tokio::test]
    async fn test_scan_aborts_on_transport_failure() {
        let table = MemoryTable::new(schema())
            .with_records(sixty())
            .with_failing_scan(2);

        let results: Vec<Result<Vec<Record>>> =
            scan_all(&table, ScanScope::Full, 25).collect().await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().map(Vec::len), Ok(25));
        assert!(matches!(results[1], Err(CoreError::Transport { .. })));
        assert_eq!(table.scan_calls(), 2);
    }

    #[tokio::test]
    async fn test_scan_partition_scope() {
        let mut records = sixty();
        records.extend((0..7).map(|i| record("q", i)));
        let table = MemoryTable::new(schema()).with_records(records);
        let filter = crate::table::PartitionFilter::parse(&schema(), "q").unwrap();

        let found = collect_all(&table, ScanScope::Partition(filter), 5)
            .await
            .unwrap();

        assert_eq!(found.len(), 7);
        assert!(found
            .iter()
            .all(|r| r.get("pk") == Some(&AttributeValue::S("q".to_string()))));
    }
}
