//! # Record Storage
//!
//! Opens the swap and monitor stores for the configured backend.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;

use crate::config::{ConfigError, StorageBackend, StorageConfig};
use htlc_core::domain::{EscrowMonitor, SwapRecord};
use htlc_core::ports::RecordStore;
use htlc_core::InMemoryRecordStore;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Swap store as used by the runtime.
pub type DynSwapStore = dyn RecordStore<SwapRecord>;
/// Monitor store as used by the runtime.
pub type DynMonitorStore = dyn RecordStore<EscrowMonitor>;

/// Both stores.
pub struct Stores {
    /// Swap records.
    pub swaps: Arc<DynSwapStore>,
    /// Escrow monitors.
    pub monitors: Arc<DynMonitorStore>,
}

/// Open both stores.
pub fn open_stores(config: &StorageConfig) -> Result<Stores, ConfigError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("[htlc] Using in-memory record stores");
            Ok(Stores {
                swaps: Arc::new(InMemoryRecordStore::<SwapRecord>::new()),
                monitors: Arc::new(InMemoryRecordStore::<EscrowMonitor>::new()),
            })
        }
        StorageBackend::RocksDb => open_rocksdb(config),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &StorageConfig) -> Result<Stores, ConfigError> {
    use rocksdb_store::{open_database, RocksDbConfig, RocksDbRecordStore, CF_MONITORS, CF_SWAPS};

    std::fs::create_dir_all(&config.data_dir).map_err(|e| ConfigError::Io(e.to_string()))?;
    check_disk_space(&config.data_dir, config.min_disk_space_percent)?;

    let path = config.data_dir.join("rocksdb");
    let db = open_database(&RocksDbConfig {
        path: path.to_string_lossy().into_owned(),
        ..RocksDbConfig::default()
    })
    .map_err(|e| ConfigError::Io(e.to_string()))?;
    info!("[htlc] Using RocksDB record stores at {:?}", path);

    Ok(Stores {
        swaps: Arc::new(RocksDbRecordStore::<SwapRecord>::new(db.clone(), CF_SWAPS)),
        monitors: Arc::new(RocksDbRecordStore::<EscrowMonitor>::new(db, CF_MONITORS)),
    })
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_config: &StorageConfig) -> Result<Stores, ConfigError> {
    Err(ConfigError::BackendUnavailable("rocksdb".into()))
}

/// Refuse to start when the data directory's volume is nearly full.
pub fn check_disk_space(path: &Path, min_percent: u8) -> Result<(), ConfigError> {
    let available = fs2::available_space(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    let total = fs2::total_space(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    if total == 0 {
        return Ok(());
    }
    let percent = ((available as u128 * 100) / total as u128) as u8;
    if percent < min_percent {
        return Err(ConfigError::InsufficientDiskSpace {
            path: path.to_path_buf(),
            available_percent: percent,
            required_percent: min_percent,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_opens() {
        let stores = open_stores(&StorageConfig::default()).unwrap();
        assert!(Arc::strong_count(&stores.swaps) == 1);
    }

    #[test]
    fn test_disk_check_passes_with_zero_threshold() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_disk_space(dir.path(), 0).is_ok());
    }

    #[test]
    fn test_disk_check_fails_above_hundred_percent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            check_disk_space(dir.path(), 101),
            Err(ConfigError::InsufficientDiskSpace { .. })
        ));
    }

    #[cfg(not(feature = "rocksdb"))]
    #[test]
    fn test_rocksdb_backend_needs_feature() {
        let config = StorageConfig {
            backend: StorageBackend::RocksDb,
            ..StorageConfig::default()
        };
        assert!(matches!(open_stores(&config), Err(ConfigError::BackendUnavailable(_))));
    }
}
