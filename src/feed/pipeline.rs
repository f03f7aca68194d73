//! Filter and sort pipeline that turns the loaded feed into a view.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CacheError;
use crate::feed::{PostStatus, ScoredPost};

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("hashtag pattern is valid"));

/// How a feed view is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewStrategy {
    /// Newest first
    #[default]
    Recent,
    /// Only posts inside the trending window, by trending score
    Trending,
    /// By engagement score
    Popular,
    /// Only admin posts, in loaded order
    Admin,
}

impl ViewStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewStrategy::Recent => "recent",
            ViewStrategy::Trending => "trending",
            ViewStrategy::Popular => "popular",
            ViewStrategy::Admin => "admin",
        }
    }
}

impl fmt::Display for ViewStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recent" => Ok(ViewStrategy::Recent),
            "trending" => Ok(ViewStrategy::Trending),
            "popular" => Ok(ViewStrategy::Popular),
            "admin" => Ok(ViewStrategy::Admin),
            other => Err(CacheError::InvalidRequest(format!(
                "Unknown feed strategy '{other}'"
            ))),
        }
    }
}

/// Lower-cased hashtags found in `content`, without the `#`.
pub fn extract_hashtags(content: &str) -> Vec<String> {
    HASHTAG
        .captures_iter(content)
        .map(|caps| caps[1].to_lowercase())
        .collect()
}

fn has_hashtag(content: &str, tag: &str) -> bool {
    HASHTAG
        .captures_iter(content)
        .any(|caps| caps[1].to_lowercase() == tag)
}

/// Selects and orders the approved posts for one feed view.
///
/// Sorting is stable, so posts with equal keys keep their loaded order.
/// The hashtag may be given with or without its leading `#` and matches
/// whole tags case-insensitively.
pub fn select_view<'a>(
    posts: &'a [ScoredPost],
    strategy: ViewStrategy,
    hashtag: Option<&str>,
) -> Vec<&'a ScoredPost> {
    let tag = hashtag
        .map(|t| t.trim().trim_start_matches('#').to_lowercase())
        .filter(|t| !t.is_empty());

    let mut view: Vec<&ScoredPost> = posts
        .iter()
        .filter(|p| p.post.status == PostStatus::Approved)
        .filter(|p| tag.as_deref().map_or(true, |t| has_hashtag(&p.post.content, t)))
        .collect();

    match strategy {
        ViewStrategy::Trending => {
            view.retain(|p| p.trending_score > 0.0);
            view.sort_by(|a, b| b.trending_score.total_cmp(&a.trending_score));
        }
        ViewStrategy::Popular => {
            view.sort_by(|a, b| b.engagement_score.total_cmp(&a.engagement_score));
        }
        ViewStrategy::Admin => {
            view.retain(|p| p.post.is_admin);
        }
        ViewStrategy::Recent => {
            view.sort_by(|a, b| b.post.timestamp_ms.cmp(&a.post.timestamp_ms));
        }
    }

    view
}
