//! Cache Module
//!
//! Persistent, partitioned key-value cache with per-entry TTL and lazy expiry.

mod backend;
mod entry;
mod partition;
mod sqlite;
mod stats;
mod store;


// Re-export public types
pub use backend::{BackendError, DurableBackend, MemoryBackend};
pub use entry::{CacheEntry, StoredRecord};
pub use partition::Partition;
pub use sqlite::SqliteBackend;
pub use stats::CacheStats;
pub(crate) use stats::StatsRecorder;
pub use store::PersistentCacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 2048;
