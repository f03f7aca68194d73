//! Content Cache
//!
//! Thin typed wrappers over the posts, media and user-data partitions.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::{Partition, PersistentCacheStore};
use crate::error::Result;
use crate::feed::CommunityPost;

pub const POST_TTL: Duration = Duration::from_secs(30 * 60);
pub const MEDIA_TTL: Duration = Duration::from_secs(60 * 60);
pub const USER_DATA_TTL: Duration = Duration::from_secs(30 * 60);

/// Downloaded media bytes with their content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaBlob {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ContentCache {
    store: Arc<PersistentCacheStore>,
}

impl ContentCache {
    pub fn new(store: Arc<PersistentCacheStore>) -> Self {
        Self { store }
    }

    pub async fn cache_post(&self, post: &CommunityPost) -> Result<()> {
        self.store.set(Partition::Posts, &post.id, post, POST_TTL).await
    }

    pub async fn get_cached_post(&self, id: &str) -> Result<Option<CommunityPost>> {
        self.store.get(Partition::Posts, id).await
    }

    pub async fn invalidate_post(&self, id: &str) -> Result<()> {
        self.store.delete(Partition::Posts, id).await
    }

    pub async fn cache_media(&self, url: &str, blob: &MediaBlob) -> Result<()> {
        self.store.set(Partition::Media, url, blob, MEDIA_TTL).await
    }

    pub async fn get_cached_media(&self, url: &str) -> Result<Option<MediaBlob>> {
        self.store.get(Partition::Media, url).await
    }

    pub async fn cache_user_data<T: Serialize>(&self, user_id: &str, value: &T) -> Result<()> {
        self.store
            .set(Partition::UserData, user_id, value, USER_DATA_TTL)
            .await
    }

    pub async fn get_cached_user_data<T: DeserializeOwned>(&self, user_id: &str) -> Result<Option<T>> {
        self.store.get(Partition::UserData, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBackend;
    use crate::clock::ManualClock;
    use crate::feed::PostStatus;
    use std::collections::HashMap;

    fn content() -> (ContentCache, ManualClock) {
        let clock = ManualClock::new(0);
        let store = PersistentCacheStore::new(Arc::new(MemoryBackend::new()), Arc::new(clock.clone()));
        (ContentCache::new(Arc::new(store)), clock)
    }

    fn post() -> CommunityPost {
        CommunityPost {
            id: "post-1".to_string(),
            author_id: "u1".to_string(),
            is_admin: false,
            like_count: 3,
            comment_count: 1,
            share_count: 0,
            timestamp_ms: 0,
            status: PostStatus::Approved,
            content: "Grateful today #thanks".to_string(),
        }
    }

    #[tokio::test]
    async fn test_post_expires_after_thirty_minutes() {
        let (content, clock) = content();
        content.cache_post(&post()).await.unwrap();

        clock.advance(30 * 60 * 1000);
        assert_eq!(content.get_cached_post("post-1").await.unwrap(), Some(post()));

        clock.advance(1);
        assert_eq!(content.get_cached_post("post-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_media_lives_for_an_hour() {
        let (content, clock) = content();
        let blob = MediaBlob {
            content_type: Some("image/png".to_string()),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        };
        content.cache_media("https://cdn.example/a.png", &blob).await.unwrap();

        clock.advance(45 * 60 * 1000);
        assert_eq!(
            content.get_cached_media("https://cdn.example/a.png").await.unwrap(),
            Some(blob)
        );

        clock.advance(16 * 60 * 1000);
        assert_eq!(content.get_cached_media("https://cdn.example/a.png").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate_post() {
        let (content, _) = content();
        content.cache_post(&post()).await.unwrap();
        content.invalidate_post("post-1").await.unwrap();
        assert_eq!(content.get_cached_post("post-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_user_data_roundtrip() {
        let (content, _) = content();
        let mut profile = HashMap::new();
        profile.insert("displayName".to_string(), "Ruth".to_string());

        content.cache_user_data("u1", &profile).await.unwrap();
        let cached: Option<HashMap<String, String>> = content.get_cached_user_data("u1").await.unwrap();
        assert_eq!(cached, Some(profile));
    }
}
