//! Media Manager Module
//!
//! Session-only caches for decoded media elements, bounded by entry count.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::clock::SharedClock;
use crate::media::RecencyIndex;

/// Default number of entries per media cache.
pub const DEFAULT_MEDIA_CAPACITY: usize = 50;

/// Share of the capacity evicted in one batch, in percent.
const EVICTION_PERCENT: usize = 20;

/// One cached media element.
#[derive(Debug, Clone)]
pub struct MediaEntry<H> {
    /// Whether the element finished loading
    pub loaded: bool,
    pub element: H,
    /// Last `mark_loaded`/`touch`, Unix milliseconds
    pub last_access: i64,
}

// == Media Cache ==
/// Fixed-capacity cache of media handles keyed by URL.
///
/// When a new URL arrives at capacity, the oldest fifth of the entries (at
/// least one) are dropped in a single batch before the insert.
pub struct MediaCache<H> {
    entries: HashMap<String, MediaEntry<H>>,
    recency: RecencyIndex,
    capacity: usize,
    evictions: u64,
    clock: SharedClock,
}

impl<H: Clone> MediaCache<H> {
    pub fn new(capacity: usize, clock: SharedClock) -> Self {
        Self {
            entries: HashMap::new(),
            recency: RecencyIndex::new(),
            capacity: capacity.max(1),
            evictions: 0,
            clock,
        }
    }

    /// True when `url` is cached and finished loading.
    pub fn is_loaded(&self, url: &str) -> bool {
        self.entries.get(url).is_some_and(|entry| entry.loaded)
    }

    /// Records a fully loaded element for `url`.
    pub fn mark_loaded(&mut self, url: &str, element: H) {
        self.insert(url, element, true);
    }

    /// Records an element that is still loading.
    pub fn mark_pending(&mut self, url: &str, element: H) {
        self.insert(url, element, false);
    }

    /// Returns the cached element. Does not refresh recency.
    pub fn get_element(&self, url: &str) -> Option<H> {
        self.entries.get(url).map(|entry| entry.element.clone())
    }

    pub fn get_entry(&self, url: &str) -> Option<&MediaEntry<H>> {
        self.entries.get(url)
    }

    /// Refreshes recency for `url`. Returns false if it is not cached.
    pub fn touch(&mut self, url: &str) -> bool {
        let now = self.clock.now_ms();
        match self.entries.get_mut(url) {
            Some(entry) => {
                entry.last_access = now;
                self.recency.touch(url, now);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, url: &str) -> Option<H> {
        self.recency.remove(url);
        self.entries.remove(url).map(|entry| entry.element)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries evicted since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    fn insert(&mut self, url: &str, element: H, loaded: bool) {
        if !self.entries.contains_key(url) && self.entries.len() >= self.capacity {
            self.evict_batch();
        }

        let now = self.clock.now_ms();
        self.entries.insert(
            url.to_string(),
            MediaEntry {
                loaded,
                element,
                last_access: now,
            },
        );
        self.recency.touch(url, now);
    }

    fn evict_batch(&mut self) {
        let count = eviction_batch_size(self.capacity);
        let evicted = self.recency.evict_oldest(count);
        for url in &evicted {
            self.entries.remove(url);
        }
        self.evictions += evicted.len() as u64;
        debug!("Evicted {} media entries, {} remain", evicted.len(), self.entries.len());
    }
}

/// Entries dropped per eviction: `EVICTION_PERCENT` of `capacity`, at least one.
fn eviction_batch_size(capacity: usize) -> usize {
    // Split to avoid overflowing `capacity * EVICTION_PERCENT`.
    let whole = capacity / 100 * EVICTION_PERCENT;
    let rest = capacity % 100 * EVICTION_PERCENT / 100;
    (whole + rest).max(1)
}

impl<H> fmt::Debug for MediaCache<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .field("evictions", &self.evictions)
            .finish()
    }
}

/// Which media cache an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

// == Media Manager ==
/// Image and video caches with the same capacity.
#[derive(Debug)]
pub struct MediaManager<H> {
    images: MediaCache<H>,
    videos: MediaCache<H>,
}

impl<H: Clone> MediaManager<H> {
    pub fn new(capacity: usize, clock: SharedClock) -> Self {
        Self {
            images: MediaCache::new(capacity, clock.clone()),
            videos: MediaCache::new(capacity, clock),
        }
    }

    pub fn cache(&self, kind: MediaKind) -> &MediaCache<H> {
        match kind {
            MediaKind::Image => &self.images,
            MediaKind::Video => &self.videos,
        }
    }

    pub fn cache_mut(&mut self, kind: MediaKind) -> &mut MediaCache<H> {
        match kind {
            MediaKind::Image => &mut self.images,
            MediaKind::Video => &mut self.videos,
        }
    }

    pub fn is_loaded(&self, kind: MediaKind, url: &str) -> bool {
        self.cache(kind).is_loaded(url)
    }

    pub fn mark_loaded(&mut self, kind: MediaKind, url: &str, element: H) {
        self.cache_mut(kind).mark_loaded(url, element);
    }

    pub fn get_element(&self, kind: MediaKind, url: &str) -> Option<H> {
        self.cache(kind).get_element(url)
    }

    /// Drops both caches.
    pub fn clear(&mut self) {
        self.images.clear();
        self.videos.clear();
    }
}
