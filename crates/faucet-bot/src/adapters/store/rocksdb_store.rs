//! # RocksDB Status Store
//!
//! Durable claim records in a dedicated `claims` column family. Values are
//! JSON encoded `ClaimRecord`s keyed by peer identity.
//!
//! RocksDB has no native insert-if-absent, so the read and the write of
//! `set_data` run under one writer lock.

use parking_lot::Mutex;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteOptions, DB};
use tracing::{debug, info};

use crate::domain::{ClaimRecord, StoreError};
use crate::ports::outbound::StatusStore;

/// Column family holding claim records.
pub const CF_CLAIMS: &str = "claims";

/// RocksDB settings.
#[derive(Debug, Clone)]
pub struct RocksDbStoreConfig {
    /// Database directory.
    pub path: String,
    /// fsync after each write (default: true).
    pub sync_writes: bool,
}

impl Default for RocksDbStoreConfig {
    fn default() -> Self {
        Self {
            path: "./data/claims".to_string(),
            sync_writes: true,
        }
    }
}

impl RocksDbStoreConfig {
    /// Config for tests (no fsync).
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sync_writes: false,
        }
    }
}

/// RocksDB-backed `StatusStore`.
pub struct RocksDbStatusStore {
    db: DB,
    config: RocksDbStoreConfig,
    write_lock: Mutex<()>,
}

impl RocksDbStatusStore {
    /// Open or create the database.
    pub fn open(config: RocksDbStoreConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut cf_opts = Options::default();
        cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
        let descriptors = vec![ColumnFamilyDescriptor::new(CF_CLAIMS, cf_opts)];

        let db = DB::open_cf_descriptors(&opts, &config.path, descriptors)
            .map_err(|e| StoreError::Io(format!("Failed to open RocksDB: {}", e)))?;

        info!("[store] opened claim store at {}", config.path);
        Ok(Self {
            db,
            config,
            write_lock: Mutex::new(()),
        })
    }

    /// Every stored record, in key order.
    pub fn claims(&self) -> Result<Vec<ClaimRecord>, StoreError> {
        let cf = self.claims_cf()?;
        self.db
            .iterator_cf(cf, IteratorMode::Start)
            .map(|item| {
                let (_, value) =
                    item.map_err(|e| StoreError::Io(format!("RocksDB iteration failed: {}", e)))?;
                decode(&value)
            })
            .collect()
    }

    fn claims_cf(&self) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(CF_CLAIMS)
            .ok_or_else(|| StoreError::Io(format!("Missing column family {}", CF_CLAIMS)))
    }
}

fn decode(value: &[u8]) -> Result<ClaimRecord, StoreError> {
    serde_json::from_slice(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl StatusStore for RocksDbStatusStore {
    fn set_data(&self, record: ClaimRecord) -> Result<(), StoreError> {
        let cf = self.claims_cf()?;
        let value =
            serde_json::to_vec(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let key = record.peer_identity.as_bytes();

        let _guard = self.write_lock.lock();
        let existing = self
            .db
            .get_pinned_cf(cf, key)
            .map_err(|e| StoreError::Io(format!("RocksDB get failed: {}", e)))?;
        if existing.is_some() {
            return Err(StoreError::AlreadyExists(record.peer_identity));
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db
            .put_cf_opt(cf, key, value, &write_opts)
            .map_err(|e| StoreError::Io(format!("RocksDB put failed: {}", e)))?;

        debug!("[store] recorded claim for peer {}", record.peer_identity);
        Ok(())
    }

    fn get_data(&self, peer_identity: &str) -> Result<Option<ClaimRecord>, StoreError> {
        let cf = self.claims_cf()?;
        self.db
            .get_pinned_cf(cf, peer_identity.as_bytes())
            .map_err(|e| StoreError::Io(format!("RocksDB get failed: {}", e)))?
            .map(|value| decode(&value))
            .transpose()
    }

    fn len(&self) -> Result<usize, StoreError> {
        let cf = self.claims_cf()?;
        let mut count = 0;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item.map_err(|e| StoreError::Io(format!("RocksDB iteration failed: {}", e)))?;
            count += 1;
        }
        Ok(count)
    }
}
