use std::{env, num::NonZeroUsize, str::FromStr, time::Duration};

use awsk_core::batch::{BatchOptions, DEFAULT_BATCH_CONCURRENCY, MAX_BATCH_SIZE};
use awsk_core::queue::{DrainOptions, DEFAULT_DRAIN_CONCURRENCY, DEFAULT_RECEIVE_BATCH};
use awsk_core::replicate::TransferOptions;
use awsk_core::scan::DEFAULT_PAGE_SIZE;

/// Largest number of messages a single receive may return.
const MAX_RECEIVE_BATCH: usize = 10;

/// Longest long-poll wait a receive accepts.
const MAX_WAIT_TIME_SECONDS: u32 = 20;

/// Runtime tuning loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Records per scan or query page (default: 25)
    pub page_size: usize,
    /// Requests per bulk write/delete call, 1..=25 (default: 25)
    pub batch_size: usize,
    /// Bulk calls in flight per operation (default: 4)
    pub batch_concurrency: usize,
    /// Messages per receive, 1..=10 (default: 10)
    pub receive_batch: usize,
    /// Messages forwarded concurrently by a drain (default: 4)
    pub drain_concurrency: usize,
    /// Long-poll wait of a receive, 0..=20 (default: 2)
    pub wait_time_seconds: u32,
    /// Visibility timeout of received messages (default: 30)
    pub visibility_timeout_seconds: u32,
    /// Deadline for forwarding one message (default: none)
    pub handle_timeout_ms: Option<u64>,
    /// Endpoint override for local emulators (default: none)
    pub endpoint_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `AWSK_PAGE_SIZE` - Scan/query page size (default: 25)
    /// - `AWSK_BATCH_SIZE` - Items per bulk call (default: 25)
    /// - `AWSK_BATCH_CONCURRENCY` - Concurrent bulk calls (default: 4)
    /// - `AWSK_RECEIVE_BATCH` - Messages per receive (default: 10)
    /// - `AWSK_DRAIN_CONCURRENCY` - Concurrent forwards of a drain (default: 4)
    /// - `AWSK_WAIT_TIME_SECONDS` - Receive long-poll wait (default: 2)
    /// - `AWSK_VISIBILITY_TIMEOUT_SECONDS` - Visibility timeout (default: 30)
    /// - `AWSK_HANDLE_TIMEOUT_MS` - Per-message forward timeout (default: none)
    /// - `AWS_ENDPOINT_URL` - Endpoint override (default: none)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            page_size: parse(lookup("AWSK_PAGE_SIZE"))
                .filter(|size: &usize| *size > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            batch_size: parse(lookup("AWSK_BATCH_SIZE"))
                .unwrap_or(MAX_BATCH_SIZE)
                .clamp(1, MAX_BATCH_SIZE),
            batch_concurrency: parse(lookup("AWSK_BATCH_CONCURRENCY"))
                .unwrap_or(DEFAULT_BATCH_CONCURRENCY)
                .max(1),
            receive_batch: parse(lookup("AWSK_RECEIVE_BATCH"))
                .unwrap_or(DEFAULT_RECEIVE_BATCH)
                .clamp(1, MAX_RECEIVE_BATCH),
            drain_concurrency: parse(lookup("AWSK_DRAIN_CONCURRENCY"))
                .unwrap_or(DEFAULT_DRAIN_CONCURRENCY)
                .max(1),
            wait_time_seconds: parse::<u32>(lookup("AWSK_WAIT_TIME_SECONDS"))
                .unwrap_or(2)
                .min(MAX_WAIT_TIME_SECONDS),
            visibility_timeout_seconds: parse(lookup("AWSK_VISIBILITY_TIMEOUT_SECONDS"))
                .unwrap_or(30),
            handle_timeout_ms: parse(lookup("AWSK_HANDLE_TIMEOUT_MS"))
                .filter(|ms: &u64| *ms > 0),
            endpoint_url: lookup("AWS_ENDPOINT_URL").filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            page_size: NonZeroUsize::new(self.page_size).unwrap_or(NonZeroUsize::MIN),
            batch: BatchOptions::new(self.batch_size, self.batch_concurrency),
        }
    }

    pub fn drain_options(&self) -> DrainOptions {
        DrainOptions {
            max_messages: NonZeroUsize::new(self.receive_batch).unwrap_or(NonZeroUsize::MIN),
            concurrency: NonZeroUsize::new(self.drain_concurrency).unwrap_or(NonZeroUsize::MIN),
            handle_timeout: self.handle_timeout_ms.map(Duration::from_millis),
        }
    }
}

fn parse<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
