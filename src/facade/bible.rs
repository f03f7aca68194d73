//! Bible Chapter Cache
//!
//! Serves chapters from the persistent cache and falls back to the remote
//! chapter API on a miss, writing successful fetches back for offline use.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{Partition, PersistentCacheStore};
use crate::error::{CacheError, RemoteError, Result};

/// How long a downloaded chapter stays cached.
pub const CHAPTER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibleVerse {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibleChapter {
    pub book: String,
    pub chapter: u32,
    pub version: String,
    pub verses: Vec<BibleVerse>,
}

impl BibleChapter {
    pub fn cache_key(&self) -> String {
        chapter_key(&self.book, self.chapter, &self.version)
    }

    /// Relabels the chapter and its verses with the requested spelling of
    /// book and version, which the case-insensitive key does not preserve.
    fn labelled(mut self, book: &str, version: &str) -> Self {
        let (book, version) = (book.trim(), version.trim());
        for verse in &mut self.verses {
            verse.book = book.to_string();
            verse.version = version.to_string();
        }
        self.book = book.to_string();
        self.version = version.to_string();
        self
    }
}

/// Composite cache key; book and version are case-insensitive.
pub fn chapter_key(book: &str, chapter: u32, version: &str) -> String {
    format!(
        "{}-{}-{}",
        book.trim().to_lowercase(),
        chapter,
        version.trim().to_lowercase()
    )
}

/// Verse as returned by the remote chapter API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteVerse {
    pub verse: u32,
    pub text: String,
}

// == Chapter Source ==
/// Remote provider of chapter text.
#[async_trait]
pub trait ChapterSource: Send + Sync {
    async fn fetch_chapter(
        &self,
        book: &str,
        chapter: u32,
        version: &str,
    ) -> std::result::Result<Vec<RemoteVerse>, RemoteError>;
}

#[derive(Debug, Deserialize)]
struct ChapterPayload {
    #[serde(default)]
    verses: Vec<RemoteVerse>,
}

/// Chapter source backed by a bible-api.com compatible HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpChapterSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChapterSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> std::result::Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn chapter_url(&self, book: &str, chapter: u32) -> String {
        format!("{}/{}+{}", self.base_url, book.trim(), chapter)
    }
}

#[async_trait]
impl ChapterSource for HttpChapterSource {
    async fn fetch_chapter(
        &self,
        book: &str,
        chapter: u32,
        version: &str,
    ) -> std::result::Result<Vec<RemoteVerse>, RemoteError> {
        let url = self.chapter_url(book, chapter);
        debug!("Fetching chapter from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("translation", version)])
            .send()
            .await
            .map_err(|e| RemoteError::Http(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(RemoteError::NotFound(format!("{book} {chapter} ({version})")))
            }
            status if !status.is_success() => return Err(RemoteError::Status(status.as_u16())),
            _ => {}
        }

        let payload: ChapterPayload = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        if payload.verses.is_empty() {
            return Err(RemoteError::NotFound(format!("{book} {chapter} ({version})")));
        }
        Ok(payload.verses)
    }
}

// == Bible Cache ==
/// Read-through chapter cache over the "bible-chapters" partition.
#[derive(Clone)]
pub struct BibleCache {
    store: Arc<PersistentCacheStore>,
    source: Arc<dyn ChapterSource>,
}

impl BibleCache {
    pub fn new(store: Arc<PersistentCacheStore>, source: Arc<dyn ChapterSource>) -> Self {
        Self { store, source }
    }

    /// Returns the chapter, from cache when possible.
    ///
    /// A cache read failure is logged and treated as a miss. A failed
    /// write-back is logged and the fetched chapter is still returned.
    /// Never returns an empty chapter: no verses is `ChapterUnavailable`.
    pub async fn get_chapter(&self, book: &str, chapter: u32, version: &str) -> Result<BibleChapter> {
        validate(book, chapter, version)?;
        let key = chapter_key(book, chapter, version);

        match self.store.get::<BibleChapter>(Partition::BibleChapters, &key).await {
            Ok(Some(cached)) if !cached.verses.is_empty() => {
                debug!("Chapter {} served from cache", key);
                return Ok(cached.labelled(book, version));
            }
            Ok(_) => {}
            Err(err) => warn!("Chapter cache read failed for {}, fetching: {}", key, err),
        }

        let unavailable = |source: RemoteError| CacheError::ChapterUnavailable {
            book: book.to_string(),
            chapter,
            version: version.to_string(),
            source,
        };

        let verses = self
            .source
            .fetch_chapter(book, chapter, version)
            .await
            .map_err(unavailable)?;
        if verses.is_empty() {
            return Err(unavailable(RemoteError::NotFound(key)));
        }

        let fetched = BibleChapter {
            book: book.to_string(),
            chapter,
            version: version.to_string(),
            verses: verses
                .into_iter()
                .map(|v| BibleVerse {
                    book: String::new(),
                    chapter,
                    verse: v.verse,
                    text: v.text.trim().to_string(),
                    version: String::new(),
                })
                .collect(),
        }
        .labelled(book, version);

        if let Err(err) = self
            .store
            .set(Partition::BibleChapters, &key, &fetched, CHAPTER_TTL)
            .await
        {
            warn!("Failed to cache chapter {}: {}", key, err);
        }
        info!("Fetched chapter {} ({} verses)", key, fetched.verses.len());
        Ok(fetched)
    }

    /// True when the chapter is available offline.
    pub async fn is_chapter_cached(&self, book: &str, chapter: u32, version: &str) -> Result<bool> {
        validate(book, chapter, version)?;
        let key = chapter_key(book, chapter, version);
        Ok(self
            .store
            .get::<BibleChapter>(Partition::BibleChapters, &key)
            .await?
            .is_some())
    }

    /// Downloads every chapter in `chapters` that is not already cached.
    ///
    /// Returns how many were fetched. Stops at the first chapter that cannot
    /// be obtained.
    pub async fn prefetch_chapters(
        &self,
        book: &str,
        chapters: RangeInclusive<u32>,
        version: &str,
    ) -> Result<usize> {
        let mut fetched = 0;
        for chapter in chapters {
            if self.is_chapter_cached(book, chapter, version).await.unwrap_or(false) {
                continue;
            }
            self.get_chapter(book, chapter, version).await?;
            fetched += 1;
        }
        Ok(fetched)
    }

    /// Drops every cached chapter.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear(Partition::BibleChapters).await
    }
}

fn validate(book: &str, chapter: u32, version: &str) -> Result<()> {
    if book.trim().is_empty() || version.trim().is_empty() {
        return Err(CacheError::InvalidRequest(
            "Book and version are required".to_string(),
        ));
    }
    if chapter < 1 {
        return Err(CacheError::InvalidRequest(
            "Chapter numbers start at 1".to_string(),
        ));
    }
    Ok(())
}
