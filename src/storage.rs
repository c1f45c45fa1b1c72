//! Persistent storage layer using RocksDB
//!
//! All writes go through a [`StoreTransaction`]: it holds the store's single
//! writer lock, reads through its own staged writes, and commits everything in
//! one atomic `WriteBatch`. A transaction dropped before `commit` (error path,
//! timeout, task cancellation) leaves the database untouched.

use rocksdb::{DBCompressionType, Direction, IteratorMode, Options, WriteBatch, DB};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::{CompressionType, StorageConfig};
use crate::errors::{LotteryResult, StorageError};

/// Read access shared by the store and by open transactions
pub trait KvRead {
    fn read(&self, key: &[u8]) -> LotteryResult<Option<Vec<u8>>>;

    /// All entries whose key starts with `prefix`, in key order
    fn scan(&self, prefix: &[u8]) -> LotteryResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

#[derive(Clone)]
pub struct OptimizedStorage {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl OptimizedStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, rocksdb::Error> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(DBCompressionType::Lz4);
        Self::open(&opts, path)
    }

    pub fn new_with_config(config: &StorageConfig) -> LotteryResult<Self> {
        if config.clear_on_start {
            tracing::warn!(path = %config.data_directory, "Clearing lottery database on start");
            DB::destroy(&Options::default(), &config.data_directory).map_err(|e| {
                StorageError::DatabaseOpenFailed(format!(
                    "Failed to clear {}: {}",
                    config.data_directory, e
                ))
            })?;
        }

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        opts.set_max_write_buffer_number(4);
        opts.set_compression_type(match config.compression {
            CompressionType::None => DBCompressionType::None,
            CompressionType::Snappy => DBCompressionType::Snappy,
            CompressionType::Lz4 => DBCompressionType::Lz4,
            CompressionType::Zstd => DBCompressionType::Zstd,
        });

        Self::open(&opts, &config.data_directory).map_err(|e| {
            StorageError::DatabaseOpenFailed(format!("{}: {}", config.data_directory, e)).into()
        })
    }

    fn open<P: AsRef<Path>>(opts: &Options, path: P) -> Result<Self, rocksdb::Error> {
        let db = DB::open(opts, path)?;
        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Start a write transaction. Waits for the previous writer to finish.
    pub async fn begin(&self) -> StoreTransaction<'_> {
        let guard = self.writer.lock().await;
        StoreTransaction {
            storage: self,
            _guard: guard,
            pending: BTreeMap::new(),
            committed: false,
        }
    }

    fn write_batch(&self, batch: WriteBatch) -> LotteryResult<()> {
        self.db
            .write(batch)
            .map_err(|e| StorageError::WriteFailed(e.to_string()).into())
    }
}

impl KvRead for OptimizedStorage {
    fn read(&self, key: &[u8]) -> LotteryResult<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| StorageError::ReadFailed(e.to_string()).into())
    }

    fn scan(&self, prefix: &[u8]) -> LotteryResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut rows = Vec::new();
        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
        }
        Ok(rows)
    }
}

/// Unit of work over [`OptimizedStorage`]
pub struct StoreTransaction<'a> {
    storage: &'a OptimizedStorage,
    _guard: MutexGuard<'a, ()>,
    /// `None` marks a staged delete
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    committed: bool,
}

impl<'a> StoreTransaction<'a> {
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: Vec<u8>) {
        self.pending.insert(key.into(), Some(value));
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.pending.insert(key.into(), None);
    }

    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Apply every staged write atomically
    pub fn commit(mut self) -> LotteryResult<()> {
        let pending = std::mem::take(&mut self.pending);
        self.committed = true;
        if pending.is_empty() {
            return Ok(());
        }

        let mut batch = WriteBatch::default();
        for (key, value) in pending {
            match value {
                Some(value) => batch.put(key, value),
                None => batch.delete(key),
            }
        }
        self.storage.write_batch(batch)
    }
}

impl KvRead for StoreTransaction<'_> {
    fn read(&self, key: &[u8]) -> LotteryResult<Option<Vec<u8>>> {
        match self.pending.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.storage.read(key),
        }
    }

    fn scan(&self, prefix: &[u8]) -> LotteryResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self.storage.scan(prefix)?.into_iter().collect();
        let staged = self
            .pending
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix));
        for (key, value) in staged {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

impl Drop for StoreTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.pending.is_empty() {
            tracing::debug!(
                discarded_writes = self.pending.len(),
                "Store transaction rolled back"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> (tempfile::TempDir, OptimizedStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = OptimizedStorage::new(dir.path()).unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_commit_applies_all_writes() {
        let (_dir, storage) = temp_storage();

        let mut tx = storage.begin().await;
        tx.put(b"a:1".to_vec(), b"one".to_vec());
        tx.put(b"a:2".to_vec(), b"two".to_vec());
        assert_eq!(tx.pending_writes(), 2);
        tx.commit().unwrap();

        assert_eq!(storage.read(b"a:1").unwrap(), Some(b"one".to_vec()));
        assert_eq!(storage.scan(b"a:").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let (_dir, storage) = temp_storage();

        {
            let mut tx = storage.begin().await;
            tx.put(b"k".to_vec(), b"v".to_vec());
        }

        assert_eq!(storage.read(b"k").unwrap(), None);
    }

    #[tokio::test]
    async fn test_transaction_reads_its_own_writes() {
        let (_dir, storage) = temp_storage();

        let mut seed = storage.begin().await;
        seed.put(b"p:1".to_vec(), b"x".to_vec());
        seed.put(b"p:2".to_vec(), b"y".to_vec());
        seed.commit().unwrap();

        let mut tx = storage.begin().await;
        tx.put(b"p:3".to_vec(), b"z".to_vec());
        tx.delete(b"p:1".to_vec());

        assert_eq!(tx.read(b"p:3").unwrap(), Some(b"z".to_vec()));
        assert_eq!(tx.read(b"p:1").unwrap(), None);

        let keys: Vec<Vec<u8>> = tx.scan(b"p:").unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"p:2".to_vec(), b"p:3".to_vec()]);

        // Outside readers see nothing until commit
        assert_eq!(storage.read(b"p:3").unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_stops_at_prefix_boundary() {
        let (_dir, storage) = temp_storage();

        let mut tx = storage.begin().await;
        tx.put(b"draw:1".to_vec(), vec![1]);
        tx.put(b"drawx".to_vec(), vec![2]);
        tx.put(b"ticket:1".to_vec(), vec![3]);
        tx.commit().unwrap();

        assert_eq!(storage.scan(b"draw:").unwrap().len(), 1);
    }
}
