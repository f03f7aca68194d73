//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Cache Entry ==
/// A single cached value with its creation and expiry instants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The stored value
    pub data: T,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Expiration timestamp (Unix milliseconds), always after `created_at`
    pub expires_at: i64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new cache entry that lives for `ttl_ms` from `now_ms`.
    ///
    /// Fails with `InvalidTtl` when `ttl_ms` is zero, since the entry would
    /// violate `expires_at > created_at`.
    pub fn new(data: T, now_ms: i64, ttl_ms: u64) -> Result<Self> {
        if ttl_ms == 0 {
            return Err(CacheError::InvalidTtl(ttl_ms));
        }
        let ttl = i64::try_from(ttl_ms).map_err(|_| CacheError::InvalidTtl(ttl_ms))?;

        Ok(Self {
            data,
            created_at: now_ms,
            expires_at: now_ms.saturating_add(ttl),
        })
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// The entry is still valid at exactly `expires_at` and expired one
    /// millisecond later.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: i64) -> u64 {
        u64::try_from(self.expires_at.saturating_sub(now_ms)).unwrap_or(0)
    }
}

// == Stored Record ==
/// Serialized form of an entry as handed to a durable backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// JSON-encoded payload
    pub payload: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl StoredRecord {
    pub fn encode<T: Serialize>(entry: &CacheEntry<T>) -> Result<Self> {
        Ok(Self {
            payload: serde_json::to_string(&entry.data)?,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
        })
    }

    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<CacheEntry<T>> {
        Ok(CacheEntry {
            data: serde_json::from_str(&self.payload)?,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }
}
