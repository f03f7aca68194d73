//! Media Module
//!
//! Bounded in-memory caches for media elements seen during this session.

mod manager;
mod recency;

pub use manager::{MediaCache, MediaEntry, MediaKind, MediaManager, DEFAULT_MEDIA_CAPACITY};
pub use recency::RecencyIndex;
