//! In-memory table and queue.
//!
//! Both implement every provider trait of this crate, record the calls they
//! receive and can be told to fail, so bulk operations can be exercised
//! without a network.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::batch::{BatchOutcome, BatchWriter, WriteRequest};
use crate::error::{CoreError, Result};
use crate::queue::{ForwardPayload, Message, MessageSink, MessageSource};
use crate::scan::{PageRequest, PagedSource, ScanCursor, ScanPage, ScanScope};
use crate::table::{extract_key, AttributeValue, KeySchema, Record, SchemaSource};

const OFFSET: &str = "offset";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn injected(operation: &'static str, call: usize) -> CoreError {
    CoreError::transport(operation, format!("injected failure on call {call}"))
}

/// A table held in memory, rows kept in insertion order.
#[derive(Debug)]
pub struct MemoryTable {
    schema: KeySchema,
    rows: Mutex<Vec<Record>>,
    batch_sizes: Mutex<Vec<usize>>,
    scan_calls: AtomicUsize,
    write_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    failing_scan: Option<usize>,
    failing_batch: Option<usize>,
    unprocessed_per_batch: usize,
    write_delay: Option<Duration>,
}

impl MemoryTable {
    pub fn new(schema: KeySchema) -> Self {
        Self {
            schema,
            rows: Mutex::new(Vec::new()),
            batch_sizes: Mutex::new(Vec::new()),
            scan_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            failing_scan: None,
            failing_batch: None,
            unprocessed_per_batch: 0,
            write_delay: None,
        }
    }

    /// Seeds rows as-is, without key deduplication.
    pub fn with_records(self, records: Vec<Record>) -> Self {
        lock(&self.rows).extend(records);
        self
    }

    /// The `call`-th page request (1-based) fails with a transport error.
    pub fn with_failing_scan(mut self, call: usize) -> Self {
        self.failing_scan = Some(call);
        self
    }

    /// The `call`-th bulk call (1-based) fails with a transport error.
    pub fn with_failing_batch(mut self, call: usize) -> Self {
        self.failing_batch = Some(call);
        self
    }

    /// Every bulk call leaves its last `count` requests unprocessed.
    pub fn with_unprocessed_per_batch(mut self, count: usize) -> Self {
        self.unprocessed_per_batch = count;
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Sizes of every bulk call received, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        lock(&self.batch_sizes).clone()
    }

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    /// Highest number of bulk calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        lock(&self.rows).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.rows).is_empty()
    }

    /// Rows in a deterministic order, for comparing two tables.
    pub fn records_sorted(&self) -> Vec<BTreeMap<String, AttributeValue>> {
        let mut rows: Vec<BTreeMap<String, AttributeValue>> = lock(&self.rows)
            .iter()
            .map(|row| row.clone().into_iter().collect())
            .collect();
        rows.sort_by_cached_key(|row| format!("{row:?}"));
        rows
    }

    fn apply(&self, request: WriteRequest) {
        let mut rows = lock(&self.rows);
        match request {
            WriteRequest::Put(record) => {
                let existing = extract_key(&record, &self.schema)
                    .ok()
                    .and_then(|key| rows.iter().position(|row| key.matches(row)));
                match existing {
                    Some(index) => rows[index] = record,
                    None => rows.push(record),
                }
            }
            WriteRequest::Delete(key) => rows.retain(|row| !key.matches(row)),
        }
    }
}

fn offset_of(cursor: Option<&ScanCursor>) -> usize {
    cursor
        .and_then(|cursor| match cursor.position().get(OFFSET) {
            Some(AttributeValue::N(offset)) => offset.parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}

#[async_trait]
impl PagedSource for MemoryTable {
    async fn scan_page(&self, request: &PageRequest) -> Result<ScanPage> {
        let call = self.scan_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_scan == Some(call) {
            return Err(injected("Scan", call));
        }

        let rows = lock(&self.rows);
        let matching: Vec<&Record> = rows
            .iter()
            .filter(|row| match &request.scope {
                ScanScope::Full => true,
                ScanScope::Partition(filter) => filter.matches(row),
            })
            .collect();

        let offset = offset_of(request.cursor.as_ref());
        let records: Vec<Record> = matching
            .iter()
            .skip(offset)
            .take(request.limit)
            .map(|row| (*row).clone())
            .collect();
        let end = offset + records.len();
        let next = (end < matching.len()).then(|| {
            ScanCursor::new(HashMap::from([(
                OFFSET.to_string(),
                AttributeValue::N(end.to_string()),
            )]))
        });

        Ok(ScanPage { records, next })
    }
}

#[async_trait]
impl BatchWriter for MemoryTable {
    async fn write_batch(&self, mut batch: Vec<WriteRequest>) -> Result<BatchOutcome> {
        let call = self.write_calls.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.batch_sizes).push(batch.len());

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_batch == Some(call) {
            return Err(injected("BatchWriteItem", call));
        }

        let split = batch.len().saturating_sub(self.unprocessed_per_batch);
        let unprocessed = batch.split_off(split);
        for request in batch {
            self.apply(request);
        }
        Ok(BatchOutcome { unprocessed })
    }
}

#[async_trait]
impl SchemaSource for MemoryTable {
    async fn key_schema(&self) -> Result<KeySchema> {
        Ok(self.schema.clone())
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Message>,
    sent: Vec<ForwardPayload>,
    acknowledged: Vec<String>,
}

/// A queue held in memory. Usable as drain source and as drain destination.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<QueueState>,
    fifo: bool,
    receive_limit: Option<usize>,
    failing_receive: Option<usize>,
    failing_send: Option<usize>,
    failing_acknowledge: bool,
    send_delay: Option<Duration>,
    receive_calls: AtomicUsize,
    send_calls: AtomicUsize,
    stops: AtomicUsize,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A destination that requires FIFO fields.
    pub fn fifo() -> Self {
        Self {
            fifo: true,
            ..Self::default()
        }
    }

    pub fn with_messages(self, messages: Vec<Message>) -> Self {
        lock(&self.state).pending.extend(messages);
        self
    }

    /// Caps the messages returned by one receive below the requested max.
    pub fn with_receive_limit(mut self, limit: usize) -> Self {
        self.receive_limit = Some(limit);
        self
    }

    /// The `call`-th receive (1-based) fails with a transport error.
    pub fn with_failing_receive(mut self, call: usize) -> Self {
        self.failing_receive = Some(call);
        self
    }

    /// The `call`-th send (1-based) fails with a transport error.
    pub fn with_failing_send(mut self, call: usize) -> Self {
        self.failing_send = Some(call);
        self
    }

    pub fn with_failing_acknowledge(mut self) -> Self {
        self.failing_acknowledge = true;
        self
    }

    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// Payloads accepted by [`MessageSink::send`], in order.
    pub fn sent(&self) -> Vec<ForwardPayload> {
        lock(&self.state).sent.clone()
    }

    /// Ids of acknowledged messages, in order.
    pub fn acknowledged(&self) -> Vec<String> {
        lock(&self.state).acknowledged.clone()
    }

    pub fn pending(&self) -> usize {
        lock(&self.state).pending.len()
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for MemoryQueue {
    async fn receive(&self, max: usize) -> Result<Vec<Message>> {
        let call = self.receive_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_receive == Some(call) {
            return Err(injected("ReceiveMessage", call));
        }

        let take = self.receive_limit.map_or(max, |limit| limit.min(max));
        let mut state = lock(&self.state);
        let take = take.min(state.pending.len());
        Ok(state.pending.drain(..take).collect())
    }

    async fn acknowledge(&self, message: &Message) -> Result<()> {
        if self.failing_acknowledge {
            return Err(CoreError::transport("DeleteMessage", "injected failure"));
        }
        lock(&self.state).acknowledged.push(message.id.clone());
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageSink for MemoryQueue {
    fn is_fifo(&self) -> bool {
        self.fifo
    }

    async fn send(&self, payload: &ForwardPayload) -> Result<()> {
        let call = self.send_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_send == Some(call) {
            return Err(injected("SendMessage", call));
        }
        lock(&self.state).sent.push(payload.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Key;

    fn schema() -> KeySchema {
        KeySchema::from_json(r#"{"id":"S"}"#).unwrap()
    }

    fn record(id: &str, value: &str) -> Record {
        Record::from([
            ("id".to_string(), AttributeValue::S(id.to_string())),
            ("value".to_string(), AttributeValue::S(value.to_string())),
        ])
    }

    #[tokio::test]
    async fn test_put_replaces_row_with_same_key() {
        let table = MemoryTable::new(schema()).with_records(vec![record("a", "old")]);

        table
            .write_batch(vec![
                WriteRequest::Put(record("a", "new")),
                WriteRequest::Put(record("b", "x")),
            ])
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.records_sorted().contains(&record("a", "new").into_iter().collect()));
    }

    #[tokio::test]
    async fn test_delete_by_key() {
        let table =
            MemoryTable::new(schema()).with_records(vec![record("a", "1"), record("b", "2")]);
        let key = Key::from_attributes(HashMap::from([(
            "id".to_string(),
            AttributeValue::S("a".to_string()),
        )]));

        table.write_batch(vec![WriteRequest::Delete(key)]).await.unwrap();

        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_receive_respects_limit() {
        let queue = MemoryQueue::new()
            .with_messages((0..4).map(|i| Message::new(i.to_string(), "b")).collect())
            .with_receive_limit(3);

        assert_eq!(queue.receive(10).await.unwrap().len(), 3);
        assert_eq!(queue.receive(10).await.unwrap().len(), 1);
        assert!(queue.receive(10).await.unwrap().is_empty());
        assert_eq!(queue.pending(), 0);
    }
}
