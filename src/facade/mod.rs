//! Facade Module
//!
//! Typed caches for one entity kind each, on top of the persistent store.

mod bible;
mod content;

pub use bible::{
    chapter_key, BibleCache, BibleChapter, BibleVerse, ChapterSource, HttpChapterSource,
    RemoteVerse, CHAPTER_TTL,
};
pub use content::{ContentCache, MediaBlob, MEDIA_TTL, POST_TTL, USER_DATA_TTL};
