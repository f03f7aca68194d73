//! Paginated Feed Loader
//!
//! Pulls pages of approved posts from the remote document store, scores them
//! on ingestion and grows an in-memory collection for the view pipeline.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::error::{CacheError, RemoteError, Result};
use crate::feed::{scoring, select_view, CommunityPost, PostDocument, PostStatus, ScoredPost, ViewStrategy};

/// Collection holding community posts in the remote store.
pub const POSTS_COLLECTION: &str = "communityPosts";

/// Field the feed is ordered by.
pub const ORDER_FIELD: &str = "timestamp";

// == Remote Store Seam ==
/// Position after the last document of a fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCursor {
    pub document_id: String,
    /// Value of the ordering field on that document
    pub order_value: Value,
}

impl PageCursor {
    fn after(doc: &PostDocument) -> Self {
        Self {
            document_id: doc.id.clone(),
            order_value: doc.fields.get(ORDER_FIELD).cloned().unwrap_or(Value::Null),
        }
    }
}

/// Query against the remote document store.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub collection: String,
    /// Equality filters, all of which must hold
    pub equals: Vec<(String, Value)>,
    pub order_by: String,
    pub descending: bool,
    pub limit: usize,
    pub start_after: Option<PageCursor>,
}

impl PageQuery {
    /// Approved posts, newest first.
    pub fn approved_posts(limit: usize, start_after: Option<PageCursor>) -> Self {
        Self {
            collection: POSTS_COLLECTION.to_string(),
            equals: vec![(
                "status".to_string(),
                Value::String(PostStatus::Approved.as_str().to_string()),
            )],
            order_by: ORDER_FIELD.to_string(),
            descending: true,
            limit,
            start_after,
        }
    }
}

/// Remote document store able to answer paged queries.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> std::result::Result<Vec<PostDocument>, RemoteError>;
}

// == Loader State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Idle,
    LoadingInitial,
    Ready,
    LoadingNext,
    /// Last load failed; loaded posts and cursor are unchanged and the same
    /// load can be retried.
    Failed,
}

/// What a load call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was applied; `added` posts passed ingestion
    Loaded { added: usize },
    /// Nothing to do: no next page, no cursor, or a load already in flight
    Skipped,
    /// A newer `load_initial` started while this request was pending
    Superseded,
}

#[derive(Debug)]
struct LoaderInner {
    state: LoaderState,
    posts: Arc<Vec<ScoredPost>>,
    cursor: Option<PageCursor>,
    has_next_page: bool,
    next_in_flight: bool,
    generation: u64,
}

// == Feed Loader ==
/// Cursor-paginated loader for the community feed.
///
/// At most one `load_next` runs at a time; extra calls made while one is
/// pending are dropped. `load_initial` starts a new generation, and any
/// response belonging to an older generation is discarded.
pub struct FeedLoader {
    source: Arc<dyn PostSource>,
    clock: SharedClock,
    page_size: usize,
    inner: Mutex<LoaderInner>,
}

/// Clears the in-flight flag even if the `load_next` future is dropped.
struct InFlightGuard<'a> {
    loader: &'a FeedLoader,
    generation: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.loader.lock();
        if inner.generation == self.generation && inner.next_in_flight {
            inner.next_in_flight = false;
            if inner.state == LoaderState::LoadingNext {
                inner.state = LoaderState::Ready;
            }
        }
    }
}

impl FeedLoader {
    pub fn new(source: Arc<dyn PostSource>, clock: SharedClock, page_size: usize) -> Self {
        Self {
            source,
            clock,
            page_size: page_size.max(1),
            inner: Mutex::new(LoaderInner {
                state: LoaderState::Idle,
                posts: Arc::new(Vec::new()),
                cursor: None,
                has_next_page: false,
                next_in_flight: false,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoaderInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Accessors ==
    pub fn state(&self) -> LoaderState {
        self.lock().state
    }

    /// Current collection. The same `Arc` is returned until a load changes it.
    pub fn posts(&self) -> Arc<Vec<ScoredPost>> {
        Arc::clone(&self.lock().posts)
    }

    pub fn has_next_page(&self) -> bool {
        self.lock().has_next_page
    }

    pub fn cursor(&self) -> Option<PageCursor> {
        self.lock().cursor.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    // == Load Initial ==
    /// Fetches the first page and replaces the collection with it.
    pub async fn load_initial(&self) -> Result<LoadOutcome> {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.state = LoaderState::LoadingInitial;
            inner.next_in_flight = false;
            inner.generation
        };

        let query = PageQuery::approved_posts(self.page_size, None);
        let result = self.source.fetch_page(&query).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            debug!("Discarding superseded initial page (generation {})", generation);
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok(docs) => {
                let fetched = docs.len();
                let posts = self.ingest(&docs);
                let added = posts.len();

                inner.posts = Arc::new(posts);
                inner.cursor = docs.last().map(PageCursor::after);
                inner.has_next_page = fetched == self.page_size;
                inner.state = LoaderState::Ready;
                info!("Loaded initial feed page: {} posts, more={}", added, inner.has_next_page);
                Ok(LoadOutcome::Loaded { added })
            }
            Err(err) => {
                inner.state = LoaderState::Failed;
                warn!("Initial feed page failed: {}", err);
                Err(CacheError::FetchPage(err))
            }
        }
    }

    // == Load Next ==
    /// Fetches the page after the cursor and appends it.
    ///
    /// Skipped when there is no next page or no cursor, while an initial load
    /// is pending, or when a call is already pending. A failure leaves posts,
    /// cursor and `has_next_page` as they were.
    pub async fn load_next(&self) -> Result<LoadOutcome> {
        let (generation, cursor) = {
            let mut inner = self.lock();
            // The cursor still belongs to the collection being replaced.
            if inner.state == LoaderState::LoadingInitial {
                return Ok(LoadOutcome::Skipped);
            }
            let cursor = match (&inner.cursor, inner.has_next_page, inner.next_in_flight) {
                (Some(cursor), true, false) => cursor.clone(),
                _ => return Ok(LoadOutcome::Skipped),
            };
            inner.next_in_flight = true;
            inner.state = LoaderState::LoadingNext;
            (inner.generation, cursor)
        };
        let _guard = InFlightGuard {
            loader: self,
            generation,
        };

        let query = PageQuery::approved_posts(self.page_size, Some(cursor));
        let result = self.source.fetch_page(&query).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            debug!("Discarding next page from generation {}", generation);
            return Ok(LoadOutcome::Superseded);
        }
        inner.next_in_flight = false;

        match result {
            Ok(docs) => {
                let fetched = docs.len();
                let posts = self.ingest(&docs);
                let added = posts.len();

                Arc::make_mut(&mut inner.posts).extend(posts);
                if let Some(last) = docs.last() {
                    inner.cursor = Some(PageCursor::after(last));
                }
                inner.has_next_page = fetched == self.page_size;
                inner.state = LoaderState::Ready;
                debug!("Appended {} posts, total={}, more={}", added, inner.posts.len(), inner.has_next_page);
                Ok(LoadOutcome::Loaded { added })
            }
            Err(err) => {
                inner.state = LoaderState::Failed;
                warn!("Next feed page failed: {}", err);
                Err(CacheError::FetchPage(err))
            }
        }
    }

    // == Scores ==
    /// Recomputes every post's scores at `now_ms`.
    pub fn refresh_scores(&self, now_ms: i64) {
        let mut inner = self.lock();
        let posts = Arc::make_mut(&mut inner.posts);
        for scored in posts.iter_mut() {
            scored.engagement_score = scoring::engagement_score(&scored.post, now_ms);
            scored.trending_score = scoring::trending_score(&scored.post, now_ms);
        }
    }

    /// Runs the view pipeline over the current collection.
    pub fn view(&self, strategy: ViewStrategy, hashtag: Option<&str>) -> Vec<ScoredPost> {
        let posts = self.posts();
        select_view(&posts, strategy, hashtag)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Decodes and scores documents, dropping ones that fail ingestion.
    fn ingest(&self, docs: &[PostDocument]) -> Vec<ScoredPost> {
        let now_ms = self.clock.now_ms();
        docs.iter()
            .filter_map(|doc| match CommunityPost::from_document(doc) {
                Ok(post) => Some(scoring::score(post, now_ms)),
                Err(err) => {
                    warn!("Skipping malformed post {}: {}", doc.id, err);
                    None
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for FeedLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("FeedLoader")
            .field("state", &inner.state)
            .field("posts", &inner.posts.len())
            .field("has_next_page", &inner.has_next_page)
            .field("generation", &inner.generation)
            .finish()
    }
}
