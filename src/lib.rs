//! Fellowship Cache - offline cache and feed ranking core
//!
//! Persistent TTL cache for Bible chapters and community content, bounded
//! media caches, and the scoring and pagination behind the community feed.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod facade;
pub mod feed;
pub mod media;
pub mod services;

pub use cache::{Partition, PersistentCacheStore};
pub use config::Config;
pub use error::{CacheError, RemoteError, Result};
pub use services::{MediaHandle, Services};
