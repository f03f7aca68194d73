//! Cache Store Module
//!
//! Persistent, partitioned key-value cache with per-entry TTL and lazy expiry.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheEntry, CacheStats, DurableBackend, Partition, StatsRecorder, StoredRecord,
    MAX_KEY_LENGTH,
};
use crate::clock::SharedClock;
use crate::error::{CacheError, Result};

#[derive(Debug, Clone)]
enum StoreState {
    Ready,
    /// Backend could not be opened; every read misses and writes are dropped.
    Degraded(String),
}

// == Persistent Cache Store ==
/// TTL-aware key-value store over a durable backend.
///
/// Expired entries are never swept in the background: a `get` that finds an
/// expired entry deletes it and reports a miss, so reads may mutate storage.
pub struct PersistentCacheStore {
    backend: Arc<dyn DurableBackend>,
    clock: SharedClock,
    state: OnceCell<StoreState>,
    stats: StatsRecorder,
}

impl PersistentCacheStore {
    // == Constructor ==
    /// Creates a store over `backend`. Nothing is opened until `initialize`
    /// or the first operation.
    pub fn new(backend: Arc<dyn DurableBackend>, clock: SharedClock) -> Self {
        Self {
            backend,
            clock,
            state: OnceCell::new(),
            stats: StatsRecorder::default(),
        }
    }

    // == Initialize ==
    /// Opens the backend and establishes every partition.
    ///
    /// Only the first call touches the backend. If it fails the store stays
    /// degraded for its whole lifetime and this keeps returning
    /// `StorageUnavailable`.
    pub async fn initialize(&self) -> Result<()> {
        match self.state().await {
            StoreState::Ready => Ok(()),
            StoreState::Degraded(reason) => Err(CacheError::StorageUnavailable(reason.clone())),
        }
    }

    /// True once initialization has failed.
    pub async fn is_degraded(&self) -> bool {
        matches!(self.state().await, StoreState::Degraded(_))
    }

    async fn state(&self) -> &StoreState {
        self.state
            .get_or_init(|| async {
                match self.backend.open(&Partition::ALL).await {
                    Ok(()) => {
                        info!("Persistent cache initialized with {} partitions", Partition::ALL.len());
                        StoreState::Ready
                    }
                    Err(err) => {
                        warn!("Persistent cache unavailable, running without it: {}", err);
                        StoreState::Degraded(err.0)
                    }
                }
            })
            .await
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    ///
    /// The new entry's TTL fully replaces the old one. On failure the
    /// previous entry, if any, is left as it was.
    pub async fn set<T: Serialize>(
        &self,
        partition: Partition,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        validate_key(key)?;
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl_ms)?;
        let record = StoredRecord::encode(&entry)?;

        if let StoreState::Degraded(_) = self.state().await {
            debug!("Dropping write to {}/{} (degraded)", partition, key);
            return Ok(());
        }

        self.backend
            .put(partition, key, record)
            .await
            .map_err(|e| CacheError::Write {
                partition: partition.name(),
                key: key.to_string(),
                reason: e.0,
            })?;
        self.stats.record_write();
        debug!("Cached {}/{} for {}ms", partition, key, ttl_ms);
        Ok(())
    }

    // == Get ==
    /// Retrieves the value stored under `key` if it has not expired.
    ///
    /// `Ok(None)` means not cached; `Err(Read)` means the cache itself failed.
    pub async fn get<T: DeserializeOwned>(
        &self,
        partition: Partition,
        key: &str,
    ) -> Result<Option<T>> {
        Ok(self.get_entry(partition, key).await?.map(|entry| entry.data))
    }

    /// Like `get`, but returns the entry with its timestamps.
    pub async fn get_entry<T: DeserializeOwned>(
        &self,
        partition: Partition,
        key: &str,
    ) -> Result<Option<CacheEntry<T>>> {
        if let StoreState::Degraded(_) = self.state().await {
            self.stats.record_miss();
            return Ok(None);
        }

        let record = self
            .backend
            .get(partition, key)
            .await
            .map_err(|e| CacheError::Read {
                partition: partition.name(),
                key: key.to_string(),
                reason: e.0,
            })?;

        let Some(record) = record else {
            self.stats.record_miss();
            debug!("Cache miss for {}/{}", partition, key);
            return Ok(None);
        };

        if record.is_expired(self.clock.now_ms()) {
            self.stats.record_expired();
            debug!("Cache entry {}/{} expired, deleting", partition, key);
            // Only the record we read; a concurrent `set` may have replaced it.
            match self
                .backend
                .delete_if_expires_at(partition, key, record.expires_at)
                .await
            {
                Ok(false) => debug!("Entry {}/{} was replaced or removed before deletion", partition, key),
                Ok(true) => {}
                // Still a miss; the next read retries the delete.
                Err(err) => warn!("Failed to delete expired entry {}/{}: {}", partition, key, err),
            }
            return Ok(None);
        }

        self.stats.record_hit();
        record.decode().map(Some)
    }

    // == Delete ==
    /// Removes an entry. Deleting a missing key is not an error.
    pub async fn delete(&self, partition: Partition, key: &str) -> Result<()> {
        if let StoreState::Degraded(_) = self.state().await {
            return Ok(());
        }
        self.backend
            .delete(partition, key)
            .await
            .map_err(|e| CacheError::Write {
                partition: partition.name(),
                key: key.to_string(),
                reason: e.0,
            })
    }

    // == Clear ==
    /// Removes every entry in one partition, leaving the others untouched.
    pub async fn clear(&self, partition: Partition) -> Result<()> {
        if let StoreState::Degraded(_) = self.state().await {
            return Ok(());
        }
        self.backend
            .clear(partition)
            .await
            .map_err(|e| CacheError::Write {
                partition: partition.name(),
                key: "*".to_string(),
                reason: e.0,
            })?;
        info!("Cleared cache partition {}", partition);
        Ok(())
    }

    // == Length ==
    /// Number of entries held in the partition, including expired entries
    /// that have not been read since they expired.
    pub async fn len(&self, partition: Partition) -> Result<usize> {
        if let StoreState::Degraded(_) = self.state().await {
            return Ok(0);
        }
        self.backend
            .count(partition)
            .await
            .map_err(|e| CacheError::Read {
                partition: partition.name(),
                key: "*".to_string(),
                reason: e.0,
            })
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for PersistentCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCacheStore")
            .field("state", &self.state.get())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
