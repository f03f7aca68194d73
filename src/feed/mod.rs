//! Feed Module
//!
//! Community post scoring, view selection and paginated loading.

mod loader;
mod pipeline;
mod post;
pub mod scoring;

pub use loader::{
    FeedLoader, LoadOutcome, LoaderState, PageCursor, PageQuery, PostSource, ORDER_FIELD,
    POSTS_COLLECTION,
};
pub use pipeline::{extract_hashtags, select_view, ViewStrategy};
pub use post::{CommunityPost, PostDocument, PostStatus, ScoredPost};
pub use scoring::{engagement_score, trending_score};
