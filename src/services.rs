//! Service wiring
//!
//! Builds the shared cache, façades and media manager once and hands them to
//! consumers explicitly.

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use crate::cache::{DurableBackend, PersistentCacheStore, SqliteBackend};
use crate::clock::{SharedClock, SystemClock};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::facade::{BibleCache, ChapterSource, ContentCache, HttpChapterSource};
use crate::feed::{FeedLoader, PostSource};
use crate::media::MediaManager;

/// Opaque platform media handle held by the media caches.
pub type MediaHandle = Arc<dyn Any + Send + Sync>;

/// Process-wide services, created once by the application.
#[derive(Clone)]
pub struct Services {
    pub config: Config,
    pub clock: SharedClock,
    pub store: Arc<PersistentCacheStore>,
    pub bible: BibleCache,
    pub content: ContentCache,
    pub media: Arc<Mutex<MediaManager<MediaHandle>>>,
}

impl Services {
    /// Wires the SQLite store and HTTP chapter source named by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = Arc::new(SqliteBackend::new(&config.db_path));
        let source = HttpChapterSource::new(
            config.bible_api_base_url.clone(),
            Duration::from_millis(config.http_timeout_ms),
        )
        .map_err(|e| CacheError::InvalidRequest(format!("Cannot build chapter client: {e}")))?;

        Ok(Self::with_parts(
            config.clone(),
            backend,
            Arc::new(source),
            Arc::new(SystemClock),
        ))
    }

    /// Wires services from explicit parts.
    pub fn with_parts(
        config: Config,
        backend: Arc<dyn DurableBackend>,
        chapter_source: Arc<dyn ChapterSource>,
        clock: SharedClock,
    ) -> Self {
        let store = Arc::new(PersistentCacheStore::new(backend, clock.clone()));
        let media = MediaManager::new(config.media_cache_capacity, clock.clone());
        info!(
            "Services ready: media_capacity={}, page_size={}",
            config.media_cache_capacity, config.feed_page_size
        );

        Self {
            bible: BibleCache::new(store.clone(), chapter_source),
            content: ContentCache::new(store.clone()),
            media: Arc::new(Mutex::new(media)),
            store,
            clock,
            config,
        }
    }

    /// A feed loader over `source` using the configured page size.
    pub fn feed_loader(&self, source: Arc<dyn PostSource>) -> FeedLoader {
        FeedLoader::new(source, self.clock.clone(), self.config.feed_page_size)
    }
}
