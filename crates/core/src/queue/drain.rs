//! Queue drain: forwards every message of a source queue to a destination
//! until the source reports empty.
//!
//! A drain moves through `Starting -> Running -> Terminating(cause) ->
//! Stopped`. The first terminal signal to arrive (queue empty, transport
//! error, processing error or timeout) wins; later ones are ignored. The
//! source consumer is stopped exactly once on every exit path.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::sanitize::sanitize_attributes;
use super::traits::{MessageSink, MessageSource};
use super::types::{FifoFields, ForwardPayload, Message};
use crate::error::{CoreError, DrainFailure, Result};

/// Message group id used for every message forwarded to a FIFO destination.
pub const REDRIVE_GROUP_ID: &str = "re-drive";

/// Messages requested per receive when nothing else is configured.
pub const DEFAULT_RECEIVE_BATCH: usize = 10;

/// Messages forwarded concurrently when nothing else is configured.
pub const DEFAULT_DRAIN_CONCURRENCY: usize = 4;

/// Why a drain ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCause {
    /// The source returned no messages. The only successful outcome.
    QueueEmpty,
    /// Receiving from or acknowledging on the source failed.
    Transport(CoreError),
    /// Building or sending the forward payload of a message failed.
    Processing { message_id: String, error: CoreError },
    /// Forwarding a message took longer than the handler timeout.
    Timeout { message_id: String, after: Duration },
}

impl TerminalCause {
    pub fn is_error(&self) -> bool {
        !matches!(self, TerminalCause::QueueEmpty)
    }
}

impl fmt::Display for TerminalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalCause::QueueEmpty => write!(f, "queue empty"),
            TerminalCause::Transport(error) => write!(f, "transport error: {error}"),
            TerminalCause::Processing { message_id, error } => {
                write!(f, "processing error on message {message_id}: {error}")
            }
            TerminalCause::Timeout { message_id, after } => {
                write!(
                    f,
                    "message {message_id} timed out after {}ms",
                    after.as_millis()
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainState {
    Starting,
    Running,
    Terminating(TerminalCause),
    Stopped(TerminalCause),
}

/// Shared state of one drain, observed through a single watch channel.
#[derive(Debug)]
pub struct DrainLifecycle {
    state: watch::Sender<DrainState>,
}

impl Default for DrainLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl DrainLifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(DrainState::Starting);
        Self { state }
    }

    pub fn state(&self) -> DrainState {
        self.state.borrow().clone()
    }

    /// `Starting -> Running`. No-op in any other state.
    pub fn run(&self) {
        let started = self.state.send_if_modified(|state| {
            if *state == DrainState::Starting {
                *state = DrainState::Running;
                true
            } else {
                false
            }
        });
        if started {
            info!("Drain running");
        }
    }

    /// Records `cause` if no terminal cause has been recorded yet.
    ///
    /// Returns whether this call won the race.
    pub fn terminate(&self, cause: TerminalCause) -> bool {
        let description = cause.to_string();
        let is_error = cause.is_error();
        let won = self.state.send_if_modified(move |state| match state {
            DrainState::Starting | DrainState::Running => {
                *state = DrainState::Terminating(cause);
                true
            }
            DrainState::Terminating(_) | DrainState::Stopped(_) => false,
        });

        match (won, is_error) {
            (true, true) => warn!(cause = %description, "Drain terminating"),
            (true, false) => info!(cause = %description, "Drain terminating"),
            (false, _) => debug!(cause = %description, "Ignoring terminal signal"),
        }
        won
    }

    pub fn is_terminating(&self) -> bool {
        matches!(
            *self.state.borrow(),
            DrainState::Terminating(_) | DrainState::Stopped(_)
        )
    }

    /// Resolves with the winning cause once one has been recorded.
    pub async fn terminated(&self) -> TerminalCause {
        let mut receiver = self.state.subscribe();
        let ended = |state: &DrainState| {
            matches!(state, DrainState::Terminating(_) | DrainState::Stopped(_))
        };
        let cause = match receiver.wait_for(ended).await {
            Ok(state) => match &*state {
                DrainState::Terminating(cause) | DrainState::Stopped(cause) => Some(cause.clone()),
                DrainState::Starting | DrainState::Running => None,
            },
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => None,
        };
        cause.unwrap_or(TerminalCause::Transport(CoreError::Cancelled))
    }

    /// Moves to `Stopped`, keeping the recorded cause. A drain stopped before
    /// any cause was recorded counts as cancelled.
    fn stop(&self) {
        self.state.send_modify(|state| {
            let cause = match std::mem::replace(state, DrainState::Starting) {
                DrainState::Terminating(cause) | DrainState::Stopped(cause) => cause,
                DrainState::Starting | DrainState::Running => {
                    TerminalCause::Transport(CoreError::Cancelled)
                }
            };
            *state = DrainState::Stopped(cause);
        });
    }
}

/// Tuning of one drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainOptions {
    /// Messages requested per receive.
    pub max_messages: NonZeroUsize,
    /// Messages forwarded concurrently.
    pub concurrency: NonZeroUsize,
    /// Deadline for forwarding one message.
    pub handle_timeout: Option<Duration>,
}

impl Default for DrainOptions {
    fn default() -> Self {
        Self {
            max_messages: NonZeroUsize::new(DEFAULT_RECEIVE_BATCH).unwrap_or(NonZeroUsize::MIN),
            concurrency: NonZeroUsize::new(DEFAULT_DRAIN_CONCURRENCY)
                .unwrap_or(NonZeroUsize::MIN),
            handle_timeout: None,
        }
    }
}

/// Generates FIFO deduplication ids that differ on every forward attempt.
#[derive(Debug, Default)]
pub struct DeduplicationIds {
    attempts: AtomicU64,
}

impl DeduplicationIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{message_id}_{unix_millis}_{attempt}`.
    pub fn next(&self, message_id: &str) -> String {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let now = chrono::Utc::now().timestamp_millis();
        format!("{message_id}_{now}_{attempt}")
    }
}

/// Terminal value of a successful drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainResult {
    pub count: u64,
    pub cause: TerminalCause,
}

/// Callback invoked with the id of every forwarded message.
pub type ProgressCallback<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Stops the consumer when the drain scope ends, however it ends.
struct StopGuard<'a, S: MessageSource + ?Sized> {
    source: &'a S,
    lifecycle: &'a DrainLifecycle,
}

impl<S: MessageSource + ?Sized> Drop for StopGuard<'_, S> {
    fn drop(&mut self) {
        self.lifecycle.stop();
        self.source.stop();
        info!("Drain stopped");
    }
}

struct Drain<'a, S: ?Sized, K: ?Sized> {
    source: &'a S,
    sink: &'a K,
    options: &'a DrainOptions,
    lifecycle: &'a DrainLifecycle,
    forwarded: AtomicU64,
    deduplication: DeduplicationIds,
    fifo: bool,
    on_progress: Option<ProgressCallback<'a>>,
}

impl<S, K> Drain<'_, S, K>
where
    S: MessageSource + ?Sized,
    K: MessageSink + ?Sized,
{
    /// Receives and forwards until a terminal cause has been recorded.
    async fn consume(&self) {
        let max = self.options.max_messages.get();
        loop {
            let messages = match self.source.receive(max).await {
                Ok(messages) => messages,
                Err(error) => {
                    self.lifecycle.terminate(TerminalCause::Transport(error));
                    return;
                }
            };
            if messages.is_empty() {
                self.lifecycle.terminate(TerminalCause::QueueEmpty);
                return;
            }
            debug!(messages = messages.len(), "Received messages");

            stream::iter(messages)
                .for_each_concurrent(self.options.concurrency.get(), |message| {
                    self.handle(message)
                })
                .await;

            if self.lifecycle.is_terminating() {
                return;
            }
        }
    }

    async fn handle(&self, message: Message) {
        if self.lifecycle.is_terminating() {
            return;
        }

        let forwarded = match self.options.handle_timeout {
            Some(after) => match tokio::time::timeout(after, self.forward(&message)).await {
                Ok(result) => result,
                Err(_) => {
                    self.lifecycle.terminate(TerminalCause::Timeout {
                        message_id: message.id.clone(),
                        after,
                    });
                    return;
                }
            },
            None => self.forward(&message).await,
        };
        if let Err(error) = forwarded {
            self.lifecycle.terminate(TerminalCause::Processing {
                message_id: message.id.clone(),
                error,
            });
            return;
        }

        if let Err(error) = self.source.acknowledge(&message).await {
            self.lifecycle.terminate(TerminalCause::Transport(error));
            return;
        }

        let count = self.forwarded.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(message_id = %message.id, count, "Message forwarded");

        if self.lifecycle.is_terminating() {
            return;
        }
        if let Some(on_progress) = self.on_progress {
            on_progress(&message.id);
        }
    }

    async fn forward(&self, message: &Message) -> Result<()> {
        let payload = self.payload(message)?;
        self.sink.send(&payload).await
    }

    fn payload(&self, message: &Message) -> Result<ForwardPayload> {
        let attributes = sanitize_attributes(&message.attributes)?;
        let fifo = self.fifo.then(|| FifoFields {
            group_id: REDRIVE_GROUP_ID.to_string(),
            deduplication_id: self.deduplication.next(&message.id),
        });
        Ok(ForwardPayload {
            id: message.id.clone(),
            body: message.body.clone(),
            attributes,
            fifo,
        })
    }
}

/// Drains `source` into `sink`.
///
/// Succeeds with the forwarded count once the source reports empty. Any
/// error-class cause fails the drain; the count forwarded until then is
/// returned inside the failure. `on_progress` never fires once the drain is
/// terminating, even for forwards that were already in flight.
pub async fn redrive<S, K>(
    source: &S,
    sink: &K,
    options: &DrainOptions,
    on_progress: Option<ProgressCallback<'_>>,
) -> std::result::Result<DrainResult, DrainFailure>
where
    S: MessageSource + ?Sized,
    K: MessageSink + ?Sized,
{
    let lifecycle = DrainLifecycle::new();
    let _guard = StopGuard {
        source,
        lifecycle: &lifecycle,
    };
    let drain = Drain {
        source,
        sink,
        options,
        lifecycle: &lifecycle,
        forwarded: AtomicU64::new(0),
        deduplication: DeduplicationIds::new(),
        fifo: sink.is_fifo(),
        on_progress,
    };

    info!(fifo = drain.fifo, "Drain starting");
    lifecycle.run();

    let cause = tokio::select! {
        cause = lifecycle.terminated() => cause,
        () = drain.consume() => lifecycle.terminated().await,
    };

    let count = drain.forwarded.load(Ordering::SeqCst);
    if cause.is_error() {
        return Err(DrainFailure {
            cause,
            forwarded: count,
        });
    }

    info!(count, "Drain complete");
    Ok(DrainResult { count, cause })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::memory::MemoryQueue;
    use crate::queue::MessageAttribute;
    use crate::ValidationError;

    fn messages(count: usize) -> Vec<Message> {
        (1..=count)
            .map(|i| Message::new(format!("m-{i}"), format!("body {i}")))
            .collect()
    }

    fn sequential() -> DrainOptions {
        DrainOptions {
            concurrency: NonZeroUsize::MIN,
            ..DrainOptions::default()
        }
    }

    #[tokio::test]
    async fn test_redrive_five_messages() {
        let source = MemoryQueue::new().with_messages(messages(5));
        let destination = MemoryQueue::new();
        let progress = Mutex::new(Vec::new());
        let on_progress = |id: &str| progress.lock().unwrap().push(id.to_string());

        let result = redrive(&source, &destination, &DrainOptions::default(), Some(&on_progress))
            .await
            .unwrap();

        assert_eq!(result.count, 5);
        assert_eq!(result.cause, TerminalCause::QueueEmpty);
        assert_eq!(progress.lock().unwrap().len(), 5);
        assert_eq!(source.stop_count(), 1);
        assert_eq!(source.acknowledged().len(), 5);
        assert_eq!(destination.sent().len(), 5);
        assert!(destination.sent().iter().all(|payload| payload.fifo.is_none()));
    }

    #[tokio::test]
    async fn test_redrive_empty_queue() {
        let source = MemoryQueue::new();
        let destination = MemoryQueue::new();

        let result = redrive(&source, &destination, &DrainOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(result.count, 0);
        assert_eq!(source.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_redrive_spans_several_receives() {
        let source = MemoryQueue::new()
            .with_messages(messages(23))
            .with_receive_limit(5);
        let destination = MemoryQueue::new();

        let result = redrive(&source, &destination, &DrainOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(result.count, 23);
        assert_eq!(source.receive_calls(), 6);
    }

    #[tokio::test]
    async fn test_processing_error_on_third_message() {
        let source = MemoryQueue::new().with_messages(messages(5));
        let destination = MemoryQueue::new().with_failing_send(3);
        let progress = Mutex::new(Vec::new());
        let on_progress = |id: &str| progress.lock().unwrap().push(id.to_string());

        let failure = redrive(&source, &destination, &sequential(), Some(&on_progress))
            .await
            .unwrap_err();

        match &failure.cause {
            TerminalCause::Processing { message_id, error } => {
                assert_eq!(message_id, "m-3");
                assert!(matches!(error, CoreError::Transport { .. }));
            }
            other => panic!("expected processing error, got {other:?}"),
        }
        assert_eq!(failure.forwarded, 2);
        assert_eq!(*progress.lock().unwrap(), vec!["m-1", "m-2"]);
        assert_eq!(source.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_inflight_forwards_after_failure_do_not_report_progress() {
        let source = MemoryQueue::new().with_messages(messages(4));
        let destination = MemoryQueue::new()
            .with_failing_send(1)
            .with_send_delay(Duration::from_millis(30));
        let progress = Mutex::new(Vec::new());
        let on_progress = |id: &str| progress.lock().unwrap().push(id.to_string());
        let options = DrainOptions {
            concurrency: NonZeroUsize::new(4).unwrap(),
            ..DrainOptions::default()
        };

        let failure = redrive(&source, &destination, &options, Some(&on_progress))
            .await
            .unwrap_err();

        assert!(matches!(
            &failure.cause,
            TerminalCause::Processing { message_id, .. } if message_id == "m-1"
        ));
        assert_eq!(failure.forwarded, 3);
        assert_eq!(destination.sent().len(), 3);
        assert_eq!(source.acknowledged().len(), 3);
        assert!(progress.lock().unwrap().is_empty());
        assert_eq!(source.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_receive_failure_is_transport_cause() {
        let source = MemoryQueue::new()
            .with_messages(messages(3))
            .with_failing_receive(1);
        let destination = MemoryQueue::new();

        let failure = redrive(&source, &destination, &DrainOptions::default(), None)
            .await
            .unwrap_err();

        assert!(matches!(failure.cause, TerminalCause::Transport(_)));
        assert_eq!(failure.forwarded, 0);
        assert!(destination.sent().is_empty());
        assert_eq!(source.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_fifo_destination_gets_group_and_distinct_dedup_ids() {
        let source = MemoryQueue::new().with_messages(vec![
            Message::new("same", "first"),
            Message::new("same", "redelivered"),
        ]);
        let destination = MemoryQueue::fifo();

        redrive(&source, &destination, &sequential(), None)
            .await
            .unwrap();

        let sent = destination.sent();
        let fifo: Vec<&FifoFields> = sent.iter().filter_map(|p| p.fifo.as_ref()).collect();
        assert_eq!(fifo.len(), 2);
        assert!(fifo.iter().all(|f| f.group_id == REDRIVE_GROUP_ID));
        assert_ne!(fifo[0].deduplication_id, fifo[1].deduplication_id);
        assert!(fifo[0].deduplication_id.starts_with("same_"));
    }

    #[tokio::test]
    async fn test_list_attribute_fails_drain() {
        let source = MemoryQueue::new().with_messages(vec![Message::new("m-1", "body")
            .with_attribute(
                "tags",
                MessageAttribute {
                    data_type: "StringList".to_string(),
                    string_list_values: vec!["a".to_string()],
                    ..MessageAttribute::default()
                },
            )]);
        let destination = MemoryQueue::new();

        let failure = redrive(&source, &destination, &DrainOptions::default(), None)
            .await
            .unwrap_err();

        assert_eq!(
            failure.cause,
            TerminalCause::Processing {
                message_id: "m-1".to_string(),
                error: CoreError::Validation(ValidationError::UnsupportedAttributeType {
                    name: "tags".to_string(),
                    data_type: "StringList".to_string(),
                }),
            }
        );
        assert!(destination.sent().is_empty());
        assert!(source.acknowledged().is_empty());
    }

    #[tokio::test]
    async fn test_slow_forward_times_out() {
        let source = MemoryQueue::new().with_messages(messages(2));
        let destination = MemoryQueue::new().with_send_delay(Duration::from_millis(200));
        let options = DrainOptions {
            handle_timeout: Some(Duration::from_millis(10)),
            ..sequential()
        };

        let failure = redrive(&source, &destination, &options, None)
            .await
            .unwrap_err();

        assert_eq!(
            failure.cause,
            TerminalCause::Timeout {
                message_id: "m-1".to_string(),
                after: Duration::from_millis(10),
            }
        );
        assert_eq!(source.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_acknowledge_failure_is_transport_cause() {
        let source = MemoryQueue::new()
            .with_messages(messages(2))
            .with_failing_acknowledge();
        let destination = MemoryQueue::new();

        let failure = redrive(&source, &destination, &sequential(), None)
            .await
            .unwrap_err();

        assert!(matches!(failure.cause, TerminalCause::Transport(_)));
        assert_eq!(failure.forwarded, 0);
        assert_eq!(destination.sent().len(), 1);
    }

    #[test]
    fn test_lifecycle_first_cause_wins() {
        let lifecycle = DrainLifecycle::new();
        lifecycle.run();

        assert!(lifecycle.terminate(TerminalCause::QueueEmpty));
        assert!(!lifecycle.terminate(TerminalCause::Transport(CoreError::transport(
            "ReceiveMessage",
            "late"
        ))));
        assert_eq!(
            lifecycle.state(),
            DrainState::Terminating(TerminalCause::QueueEmpty)
        );

        lifecycle.stop();
        assert_eq!(lifecycle.state(), DrainState::Stopped(TerminalCause::QueueEmpty));
        assert!(!lifecycle.terminate(TerminalCause::QueueEmpty));
    }

    #[test]
    fn test_lifecycle_stop_without_cause_is_cancelled() {
        let lifecycle = DrainLifecycle::new();
        lifecycle.run();
        lifecycle.stop();

        assert_eq!(
            lifecycle.state(),
            DrainState::Stopped(TerminalCause::Transport(CoreError::Cancelled))
        );
    }

    #[test]
    fn test_deduplication_ids_differ_per_attempt() {
        let ids = DeduplicationIds::new();

        let first = ids.next("abc");
        let second = ids.next("abc");

        assert_ne!(first, second);
        assert!(first.starts_with("abc_"));
        assert!(first.ends_with("_0"));
        assert!(second.ends_with("_1"));
    }

    #[test]
    fn test_terminal_cause_display() {
        let cause = TerminalCause::Timeout {
            message_id: "m-9".to_string(),
            after: Duration::from_millis(250),
        };
        assert_eq!(cause.to_string(), "message m-9 timed out after 250ms");
        assert!(cause.is_error());
        assert!(!TerminalCause::QueueEmpty.is_error());
    }
}
