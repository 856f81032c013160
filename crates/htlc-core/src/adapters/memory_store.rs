//! In-memory record store.
//!
//! Implements `RecordStore` for any `HistoryRecord`. Each read-modify-write
//! runs under one lock and works on a copy, so concurrent writers to a key
//! are serialized and a failed mutation leaves the stored record as it was.

use crate::domain::SwapError;
use crate::ports::outbound::{HistoryRecord, Mutation, RecordStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

/// Map-backed store.
pub struct InMemoryRecordStore<R> {
    records: Mutex<HashMap<String, R>>,
    /// Writes that will fail with `Persistence` before reaching the map.
    failing_writes: AtomicU32,
}

impl<R> InMemoryRecordStore<R> {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failing_writes: AtomicU32::new(0),
        }
    }

    /// Make the next `count` writes fail as if the store were offline.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn check_available(&self) -> Result<(), SwapError> {
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(SwapError::Persistence("store unavailable".into()));
        }
        Ok(())
    }
}

impl<R> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: HistoryRecord> RecordStore<R> for InMemoryRecordStore<R> {
    async fn get(&self, key: &str) -> Result<R, SwapError> {
        self.records
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| SwapError::NotFound(key.to_string()))
    }

    async fn insert(&self, record: R) -> Result<R, SwapError> {
        self.check_available()?;
        let key = record.record_key();
        let mut records = self.records.lock();
        if records.contains_key(&key) {
            return Err(SwapError::Validation(format!("record {key} already exists")));
        }
        records.insert(key.clone(), record.clone());
        debug!("[htlc] Stored record {}", key);
        Ok(record)
    }

    async fn upsert(&self, key: &str, mutation: Mutation<R>) -> Result<R, SwapError> {
        self.check_available()?;
        let mut records = self.records.lock();
        let current = records
            .get(key)
            .ok_or_else(|| SwapError::NotFound(key.to_string()))?;
        let mut next = current.clone();
        mutation(&mut next)?;
        records.insert(key.to_string(), next.clone());
        Ok(next)
    }

    async fn append_history(&self, key: &str, event: R::Event) -> Result<R, SwapError> {
        self.upsert(
            key,
            Box::new(move |record: &mut R| {
                record.append_event(event);
                Ok(())
            }),
        )
        .await
    }

    async fn list(&self) -> Result<Vec<R>, SwapError> {
        Ok(self.records.lock().values().cloned().collect())
    }
}
