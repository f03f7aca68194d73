//! Durable Backend Module
//!
//! The storage seam under the persistent cache, plus an in-memory backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::cache::{Partition, StoredRecord};

/// Failure reported by a durable backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BackendError(pub String);

/// Partitioned key-value storage with single-operation atomicity.
///
/// Implementations must apply each call as one atomic step: a `put` that
/// fails leaves any previous record for the key in place.
#[async_trait]
pub trait DurableBackend: Send + Sync {
    /// Opens the store and creates any missing partitions. Must be idempotent.
    async fn open(&self, partitions: &[Partition]) -> Result<(), BackendError>;

    async fn get(&self, partition: Partition, key: &str)
        -> Result<Option<StoredRecord>, BackendError>;

    async fn put(
        &self,
        partition: Partition,
        key: &str,
        record: StoredRecord,
    ) -> Result<(), BackendError>;

    async fn delete(&self, partition: Partition, key: &str) -> Result<(), BackendError>;

    /// Deletes the record only while it still carries `expires_at`, so a
    /// record written after the caller's read survives. Returns whether a
    /// record was removed.
    async fn delete_if_expires_at(
        &self,
        partition: Partition,
        key: &str,
        expires_at: i64,
    ) -> Result<bool, BackendError>;

    async fn clear(&self, partition: Partition) -> Result<(), BackendError>;

    /// Number of records currently stored in the partition.
    async fn count(&self, partition: Partition) -> Result<usize, BackendError>;
}

// == Memory Backend ==
/// Volatile backend over per-partition hash maps.
///
/// Switches allow tests to simulate an unopenable store or transient
/// read/write faults.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    partitions: RwLock<HashMap<Partition, HashMap<String, StoredRecord>>>,
    fail_open: AtomicBool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `open` fail.
    pub fn fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `get` and `count` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `put`, `delete` and `clear` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), BackendError> {
        if flag.load(Ordering::SeqCst) {
            Err(BackendError(format!("simulated {what} failure")))
        } else {
            Ok(())
        }
    }

    fn missing(partition: Partition) -> BackendError {
        BackendError(format!("partition '{partition}' does not exist"))
    }
}

#[async_trait]
impl DurableBackend for MemoryBackend {
    async fn open(&self, partitions: &[Partition]) -> Result<(), BackendError> {
        Self::check(&self.fail_open, "open")?;
        let mut guard = self.partitions.write().await;
        for partition in partitions {
            guard.entry(*partition).or_default();
        }
        Ok(())
    }

    async fn get(
        &self,
        partition: Partition,
        key: &str,
    ) -> Result<Option<StoredRecord>, BackendError> {
        Self::check(&self.fail_reads, "read")?;
        let guard = self.partitions.read().await;
        let store = guard.get(&partition).ok_or_else(|| Self::missing(partition))?;
        Ok(store.get(key).cloned())
    }

    async fn put(
        &self,
        partition: Partition,
        key: &str,
        record: StoredRecord,
    ) -> Result<(), BackendError> {
        Self::check(&self.fail_writes, "write")?;
        let mut guard = self.partitions.write().await;
        let store = guard
            .get_mut(&partition)
            .ok_or_else(|| Self::missing(partition))?;
        store.insert(key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, partition: Partition, key: &str) -> Result<(), BackendError> {
        Self::check(&self.fail_writes, "delete")?;
        let mut guard = self.partitions.write().await;
        if let Some(store) = guard.get_mut(&partition) {
            store.remove(key);
        }
        Ok(())
    }

    async fn delete_if_expires_at(
        &self,
        partition: Partition,
        key: &str,
        expires_at: i64,
    ) -> Result<bool, BackendError> {
        Self::check(&self.fail_writes, "delete")?;
        let mut guard = self.partitions.write().await;
        let Some(store) = guard.get_mut(&partition) else {
            return Ok(false);
        };
        if store.get(key).is_some_and(|r| r.expires_at == expires_at) {
            store.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn clear(&self, partition: Partition) -> Result<(), BackendError> {
        Self::check(&self.fail_writes, "clear")?;
        let mut guard = self.partitions.write().await;
        if let Some(store) = guard.get_mut(&partition) {
            store.clear();
        }
        Ok(())
    }

    async fn count(&self, partition: Partition) -> Result<usize, BackendError> {
        Self::check(&self.fail_reads, "count")?;
        let guard = self.partitions.read().await;
        Ok(guard.get(&partition).map_or(0, HashMap::len))
    }
}
