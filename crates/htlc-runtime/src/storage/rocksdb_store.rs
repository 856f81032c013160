//! # RocksDB Record Store
//!
//! Durable `RecordStore` for swap records and escrow monitors.
//!
//! ## Column Families
//!
//! - `swaps` - `SwapRecord` by swap id
//! - `monitors` - `EscrowMonitor` by `{swap_id}:{chain}`
//!
//! Values are JSON. Read-modify-write is serialized per store by an async
//! mutex, so two writers never interleave on the same record.

use async_trait::async_trait;
use htlc_core::domain::SwapError;
use htlc_core::ports::{HistoryRecord, Mutation, RecordStore};
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteOptions, DB};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Column family for swap records.
pub const CF_SWAPS: &str = "swaps";
/// Column family for escrow monitors.
pub const CF_MONITORS: &str = "monitors";

/// All column families.
pub const COLUMN_FAMILIES: &[&str] = &[CF_SWAPS, CF_MONITORS];

/// RocksDB tuning.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Database directory.
    pub path: String,
    /// Block cache size in bytes (default: 64MB).
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB).
    pub write_buffer_size: usize,
    /// fsync after each write (default: true).
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/rocksdb".to_string(),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Small buffers, no fsync.
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// Open (or create) the database with both column families.
pub fn open_database(config: &RocksDbConfig) -> Result<Arc<SharedDb>, SwapError> {
    let mut opts = Options::default();
    opts.create_if_missing(true);
    opts.create_missing_column_families(true);
    opts.set_write_buffer_size(config.write_buffer_size);
    opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

    let mut block_opts = rocksdb::BlockBasedOptions::default();
    block_opts.set_bloom_filter(10.0, false);
    block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
    opts.set_block_based_table_factory(&block_opts);

    let descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
        .iter()
        .map(|name| {
            let mut cf_opts = Options::default();
            cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
            ColumnFamilyDescriptor::new(*name, cf_opts)
        })
        .collect();

    let db = DB::open_cf_descriptors(&opts, &config.path, descriptors)
        .map_err(|e| SwapError::Persistence(format!("failed to open RocksDB: {e}")))?;
    Ok(Arc::new(SharedDb {
        db,
        sync_writes: config.sync_writes,
    }))
}

/// Database handle shared by the stores.
pub struct SharedDb {
    db: DB,
    sync_writes: bool,
}

/// `RecordStore` over one column family.
pub struct RocksDbRecordStore<R> {
    shared: Arc<SharedDb>,
    cf: &'static str,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> R>,
}

impl<R: HistoryRecord> RocksDbRecordStore<R> {
    /// Store records of type `R` in column family `cf`.
    pub fn new(shared: Arc<SharedDb>, cf: &'static str) -> Self {
        Self {
            shared,
            cf,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    fn read(&self, key: &str) -> Result<Option<R>, SwapError> {
        let cf = self.handle()?;
        let bytes = self
            .shared
            .db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| SwapError::Persistence(format!("read {key}: {e}")))?;
        bytes
            .map(|b| {
                serde_json::from_slice(&b)
                    .map_err(|e| SwapError::Persistence(format!("decode {key}: {e}")))
            })
            .transpose()
    }

    fn write(&self, key: &str, record: &R) -> Result<(), SwapError> {
        let cf = self.handle()?;
        let bytes = serde_json::to_vec(record)
            .map_err(|e| SwapError::Persistence(format!("encode {key}: {e}")))?;
        let mut opts = WriteOptions::default();
        opts.set_sync(self.shared.sync_writes);
        self.shared
            .db
            .put_cf_opt(cf, key.as_bytes(), bytes, &opts)
            .map_err(|e| SwapError::Persistence(format!("write {key}: {e}")))
    }

    fn handle(&self) -> Result<&rocksdb::ColumnFamily, SwapError> {
        self.shared
            .db
            .cf_handle(self.cf)
            .ok_or_else(|| SwapError::Persistence(format!("column family {} missing", self.cf)))
    }
}

#[async_trait]
impl<R: HistoryRecord> RecordStore<R> for RocksDbRecordStore<R> {
    async fn get(&self, key: &str) -> Result<R, SwapError> {
        self.read(key)?
            .ok_or_else(|| SwapError::NotFound(key.to_string()))
    }

    async fn insert(&self, record: R) -> Result<R, SwapError> {
        let key = record.record_key();
        let _guard = self.write_lock.lock().await;
        if self.read(&key)?.is_some() {
            return Err(SwapError::Validation(format!("record {key} already exists")));
        }
        self.write(&key, &record)?;
        debug!("[htlc] Stored record {} in {}", key, self.cf);
        Ok(record)
    }

    async fn upsert(&self, key: &str, mutation: Mutation<R>) -> Result<R, SwapError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self
            .read(key)?
            .ok_or_else(|| SwapError::NotFound(key.to_string()))?;
        mutation(&mut record)?;
        self.write(key, &record)?;
        Ok(record)
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
        let cf = self.handle()?;
        self.shared
            .db
            .iterator_cf(cf, IteratorMode::Start)
            .map(|item| {
                let (_, value) = item.map_err(|e| SwapError::Persistence(e.to_string()))?;
                serde_json::from_slice(&value).map_err(|e| SwapError::Persistence(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use htlc_core::domain::{ChainType, EscrowMonitor, MonitorEvent, MonitorStatus};
    use uuid::Uuid;

    fn store(dir: &tempfile::TempDir) -> RocksDbRecordStore<EscrowMonitor> {
        let path = dir.path().join("db");
        let db = open_database(&RocksDbConfig::for_testing(path.to_string_lossy())).unwrap();
        RocksDbRecordStore::new(db, CF_MONITORS)
    }

    fn monitor() -> EscrowMonitor {
        EscrowMonitor::new(Uuid::new_v4(), ChainType::Evm, "0x01", [7; 32], 1600, 1000)
    }

    #[tokio::test]
    async fn test_insert_get_and_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let m = monitor();
        store.insert(m.clone()).await.unwrap();
        assert_eq!(store.get(&m.key()).await.unwrap().swap_id, m.swap_id);
        assert!(store.insert(m).await.is_err());
        assert!(matches!(store.get("nope").await, Err(SwapError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_mutation_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let m = monitor();
        let key = m.key();
        store.insert(m).await.unwrap();

        store
            .upsert(&key, Box::new(|m: &mut EscrowMonitor| m.advance(MonitorEvent::new(1100, MonitorStatus::Canceled))))
            .await
            .unwrap();
        let rejected = store
            .upsert(&key, Box::new(|m: &mut EscrowMonitor| m.advance(MonitorEvent::new(1200, MonitorStatus::Resolved))))
            .await;
        assert!(rejected.is_err());

        let stored = store.get(&key).await.unwrap();
        assert_eq!(stored.status, MonitorStatus::Canceled);
        assert_eq!(stored.history.len(), 2);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store(&dir));
        let m = monitor();
        let key = m.key();
        store.insert(m).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16u64 {
            let store = store.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_history(&key, MonitorEvent::new(1000 + i, MonitorStatus::Pending))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.get(&key).await.unwrap().history.len(), 17);
    }
}
