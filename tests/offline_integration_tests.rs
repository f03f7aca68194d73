//! Integration Tests for the offline cache and feed
//!
//! Exercises the public API end to end with in-process collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use fellowship_cache::cache::{MemoryBackend, SqliteBackend};
use fellowship_cache::clock::ManualClock;
use fellowship_cache::facade::{ChapterSource, RemoteVerse, CHAPTER_TTL};
use fellowship_cache::feed::{
    LoadOutcome, PageQuery, PostDocument, PostSource, PostStatus, ViewStrategy,
};
use fellowship_cache::{CacheError, Config, Partition, RemoteError, Services};

const NOW: i64 = 1_700_000_000_000;
const HOUR: i64 = 3_600_000;

// == Helper Types ==

#[derive(Default)]
struct FakeChapterApi {
    calls: AtomicUsize,
}

#[async_trait]
impl ChapterSource for FakeChapterApi {
    async fn fetch_chapter(
        &self,
        book: &str,
        chapter: u32,
        _version: &str,
    ) -> Result<Vec<RemoteVerse>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if book == "Genesis" && chapter == 1 {
            Ok(vec![
                RemoteVerse {
                    verse: 1,
                    text: "In the beginning God created the heaven and the earth.".into(),
                },
                RemoteVerse {
                    verse: 2,
                    text: "And the earth was without form, and void.".into(),
                },
            ])
        } else {
            Err(RemoteError::NotFound(format!("{book} {chapter}")))
        }
    }
}

/// Remote store holding all posts, served newest first in pages.
struct FakeFeedStore {
    docs: Vec<PostDocument>,
    fail_next: Mutex<bool>,
}

#[async_trait]
impl PostSource for FakeFeedStore {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<PostDocument>, RemoteError> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(RemoteError::Http("connection reset".into()));
        }
        let start = match &query.start_after {
            Some(cursor) => {
                self.docs
                    .iter()
                    .position(|d| d.id == cursor.document_id)
                    .map_or(self.docs.len(), |i| i + 1)
            }
            None => 0,
        };
        Ok(self.docs.iter().skip(start).take(query.limit).cloned().collect())
    }
}

fn post_doc(id: &str, hours_ago: i64, fields: Value) -> PostDocument {
    let Value::Object(mut map) = json!({
        "authorId": "member",
        "status": "approved",
        "timestamp": NOW - hours_ago * HOUR,
    }) else {
        unreachable!()
    };
    if let Value::Object(extra) = fields {
        map.extend(extra);
    }
    PostDocument::new(id, map)
}

fn memory_services(clock: &ManualClock, api: Arc<FakeChapterApi>) -> Services {
    Services::with_parts(
        Config::default(),
        Arc::new(MemoryBackend::new()),
        api,
        Arc::new(clock.clone()),
    )
}

// == Chapter Tests ==

#[tokio::test]
async fn test_cold_then_warm_chapter_read() {
    let clock = ManualClock::new(NOW);
    let api = Arc::new(FakeChapterApi::default());
    let services = memory_services(&clock, api.clone());

    let cold = services.bible.get_chapter("Genesis", 1, "kjv").await.unwrap();
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);

    let entry = services
        .store
        .get_entry::<serde_json::Value>(Partition::BibleChapters, "genesis-1-kjv")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.expires_at - entry.created_at, CHAPTER_TTL.as_millis() as i64);

    clock.advance(23 * HOUR);
    let warm = services.bible.get_chapter("Genesis", 1, "kjv").await.unwrap();
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        serde_json::to_vec(&warm.verses).unwrap(),
        serde_json::to_vec(&cold.verses).unwrap()
    );
}

#[tokio::test]
async fn test_missing_chapter_is_unavailable_not_empty() {
    let clock = ManualClock::new(NOW);
    let services = memory_services(&clock, Arc::new(FakeChapterApi::default()));

    let err = services.bible.get_chapter("Obadiah", 2, "kjv").await.unwrap_err();
    assert!(matches!(
        err,
        CacheError::ChapterUnavailable {
            source: RemoteError::NotFound(_),
            ..
        }
    ));
    assert!(!services.bible.is_chapter_cached("Obadiah", 2, "kjv").await.unwrap());
}

#[tokio::test]
async fn test_chapters_survive_restart_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("offline.sqlite");
    let clock = ManualClock::new(NOW);
    let api = Arc::new(FakeChapterApi::default());

    {
        let services = Services::with_parts(
            Config::default(),
            Arc::new(SqliteBackend::new(&path)),
            api.clone(),
            Arc::new(clock.clone()),
        );
        services.store.initialize().await.unwrap();
        services.bible.get_chapter("Genesis", 1, "kjv").await.unwrap();
    }

    let services = Services::with_parts(
        Config::default(),
        Arc::new(SqliteBackend::new(&path)),
        api.clone(),
        Arc::new(clock.clone()),
    );
    let chapter = services.bible.get_chapter("Genesis", 1, "kjv").await.unwrap();
    assert_eq!(chapter.verses.len(), 2);
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_degraded_store_still_serves_chapters() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_open(true);
    let api = Arc::new(FakeChapterApi::default());
    let services = Services::with_parts(
        Config::default(),
        backend,
        api.clone(),
        Arc::new(ManualClock::new(NOW)),
    );

    assert!(matches!(
        services.store.initialize().await,
        Err(CacheError::StorageUnavailable(_))
    ));
    services.bible.get_chapter("Genesis", 1, "kjv").await.unwrap();
    services.bible.get_chapter("Genesis", 1, "kjv").await.unwrap();
    assert_eq!(api.calls.load(Ordering::SeqCst), 2);
}

// == Feed Tests ==

#[tokio::test]
async fn test_feed_pages_then_views() {
    let clock = ManualClock::new(NOW);
    let services = memory_services(&clock, Arc::new(FakeChapterApi::default()));
    let mut docs: Vec<PostDocument> = (0..10)
        .map(|i| post_doc(&format!("p{i}"), i + 1, json!({ "likeCount": 1 })))
        .collect();
    docs.push(post_doc(
        "viral",
        12,
        json!({ "likeCount": 40, "commentCount": 10, "shareCount": 5, "content": "Revival #Hope" }),
    ));
    docs.push(post_doc(
        "announcement",
        60,
        json!({ "isAdmin": true, "content": "Retreat signups #hope" }),
    ));
    let store = Arc::new(FakeFeedStore {
        docs,
        fail_next: Mutex::new(false),
    });
    let loader = services.feed_loader(store.clone());

    assert_eq!(loader.load_initial().await.unwrap(), LoadOutcome::Loaded { added: 10 });
    assert!(loader.has_next_page());

    *store.fail_next.lock().unwrap() = true;
    assert!(matches!(loader.load_next().await, Err(CacheError::FetchPage(_))));
    assert_eq!(loader.posts().len(), 10);

    assert_eq!(loader.load_next().await.unwrap(), LoadOutcome::Loaded { added: 2 });
    assert!(!loader.has_next_page());
    assert_eq!(loader.load_next().await.unwrap(), LoadOutcome::Skipped);

    let popular = loader.view(ViewStrategy::Popular, None);
    assert_eq!(popular[0].post.id, "viral");

    let trending = loader.view(ViewStrategy::Trending, None);
    assert!(trending.iter().all(|p| p.post.id != "announcement"));

    let admin = loader.view(ViewStrategy::Admin, None);
    assert_eq!(admin.len(), 1);
    assert_eq!(admin[0].post.id, "announcement");

    let hope: Vec<_> = loader
        .view(ViewStrategy::Recent, Some("hope"))
        .into_iter()
        .map(|p| p.post.id)
        .collect();
    assert_eq!(hope, vec!["viral", "announcement"]);
}

#[tokio::test]
async fn test_cached_post_roundtrip_through_content_cache() {
    let clock = ManualClock::new(NOW);
    let services = memory_services(&clock, Arc::new(FakeChapterApi::default()));
    let store = Arc::new(FakeFeedStore {
        docs: vec![post_doc("p1", 1, json!({ "commentCount": 2 }))],
        fail_next: Mutex::new(false),
    });
    let loader = services.feed_loader(store);
    loader.load_initial().await.unwrap();

    let post = loader.posts()[0].post.clone();
    assert_eq!(post.status, PostStatus::Approved);
    services.content.cache_post(&post).await.unwrap();

    assert_eq!(services.content.get_cached_post("p1").await.unwrap(), Some(post));
}

#[tokio::test]
async fn test_feed_skips_posts_with_unrepresentable_timestamps() {
    let clock = ManualClock::new(NOW);
    let services = memory_services(&clock, Arc::new(FakeChapterApi::default()));
    let store = Arc::new(FakeFeedStore {
        docs: vec![
            post_doc("ok", 1, json!({ "likeCount": 2 })),
            post_doc("overflow", 0, json!({ "timestamp": { "seconds": i64::MAX } })),
            post_doc("far-past", 0, json!({ "timestamp": -1e300 })),
            post_doc("far-future", 0, json!({ "timestamp": 1e300 })),
        ],
        fail_next: Mutex::new(false),
    });
    let loader = services.feed_loader(store);

    assert_eq!(loader.load_initial().await.unwrap(), LoadOutcome::Loaded { added: 1 });
    let ids: Vec<_> = loader
        .view(ViewStrategy::Popular, None)
        .into_iter()
        .map(|p| p.post.id)
        .collect();
    assert_eq!(ids, vec!["ok"]);
    assert_eq!(loader.cursor().unwrap().document_id, "far-future");
}
