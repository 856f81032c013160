//! # Outbound Ports
//!
//! Traits for the external collaborators: one chain client per chain
//! family, a record store per record type, and a clock.

use crate::domain::{
    BlockRef, Confirmation, EscrowMonitor, MonitorEvent, SwapError, SwapEvent, SwapRecord,
    TransactionRequest, TxHash, ChainType,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Chain submission collaborator.
///
/// Signing, fee estimation and RPC transport live behind this trait.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain family served.
    fn chain(&self) -> ChainType;

    /// Sign and broadcast `request`.
    async fn submit(&self, request: &TransactionRequest) -> Result<TxHash, SwapError>;

    /// Wait until `tx_hash` is included, or `timeout` elapses.
    async fn await_confirmation(
        &self,
        tx_hash: &str,
        timeout: Duration,
    ) -> Result<Confirmation, SwapError>;

    /// Close time of a block / ledger (Unix seconds).
    async fn get_block_timestamp(&self, block: BlockRef) -> Result<u64, SwapError>;
}

/// Record with an append-only history, storable under a string key.
pub trait HistoryRecord: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// History entry type.
    type Event: Clone + Send + Sync + 'static;

    /// Store key.
    fn record_key(&self) -> String;

    /// Append one entry.
    fn append_event(&mut self, event: Self::Event);

    /// Number of entries.
    fn history_len(&self) -> usize;
}

impl HistoryRecord for SwapRecord {
    type Event = SwapEvent;

    fn record_key(&self) -> String {
        self.id.to_string()
    }

    fn append_event(&mut self, event: SwapEvent) {
        self.push_event(event);
    }

    fn history_len(&self) -> usize {
        self.history.len()
    }
}

impl HistoryRecord for EscrowMonitor {
    type Event = MonitorEvent;

    fn record_key(&self) -> String {
        self.key()
    }

    fn append_event(&mut self, mut event: MonitorEvent) {
        if let Some(last) = self.history.last() {
            event.timestamp = event.timestamp.max(last.timestamp);
        }
        self.history.push(event);
    }

    fn history_len(&self) -> usize {
        self.history.len()
    }
}

/// Mutation applied inside a store's read-modify-write. An error aborts
/// the write and leaves the stored record untouched.
pub type Mutation<R> = Box<dyn FnOnce(&mut R) -> Result<(), SwapError> + Send>;

/// Persistence collaborator.
///
/// Every write is a single-record read-modify-write; concurrent writes to
/// the same key are serialized.
#[async_trait]
pub trait RecordStore<R: HistoryRecord>: Send + Sync {
    /// Fetch by key, `SwapError::NotFound` if absent.
    async fn get(&self, key: &str) -> Result<R, SwapError>;

    /// Insert a new record; fails if the key exists.
    async fn insert(&self, record: R) -> Result<R, SwapError>;

    /// Atomically apply `mutation` to the stored record.
    async fn upsert(&self, key: &str, mutation: Mutation<R>) -> Result<R, SwapError>;

    /// Atomically append one history entry.
    async fn append_history(&self, key: &str, event: R::Event) -> Result<R, SwapError>;

    /// All records.
    async fn list(&self) -> Result<Vec<R>, SwapError>;
}

/// Clock abstraction so windows can be tested without sleeping.
pub trait TimeSource: Send + Sync {
    /// Current Unix time in seconds.
    fn now(&self) -> u64;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
