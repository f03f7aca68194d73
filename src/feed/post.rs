//! Community post records as seen by the ranking engine, and the ingestion
//! boundary that turns raw remote documents into them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RemoteError;

/// Moderation state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Approved,
    #[default]
    Pending,
    Rejected,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Approved => "approved",
            PostStatus::Pending => "pending",
            PostStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approved" => Ok(PostStatus::Approved),
            "pending" => Ok(PostStatus::Pending),
            "rejected" => Ok(PostStatus::Rejected),
            other => Err(RemoteError::Decode(format!("unknown post status '{other}'"))),
        }
    }
}

/// A community post with exactly the fields ranking reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPost {
    pub id: String,
    pub author_id: String,
    pub is_admin: bool,
    pub like_count: u64,
    pub comment_count: u64,
    pub share_count: u64,
    /// Creation time, Unix milliseconds
    pub timestamp_ms: i64,
    pub status: PostStatus,
    #[serde(default)]
    pub content: String,
}

/// A post annotated with the scores computed when it was ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPost {
    #[serde(flatten)]
    pub post: CommunityPost,
    pub engagement_score: f64,
    pub trending_score: f64,
}

/// A raw document snapshot from the remote store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl PostDocument {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

impl CommunityPost {
    /// Builds a post from a remote document.
    ///
    /// Missing counters default to 0, a missing `isAdmin` to false and a
    /// missing `status` to pending. A document without `authorId` or a
    /// usable `timestamp` is rejected.
    pub fn from_document(doc: &PostDocument) -> Result<Self, RemoteError> {
        let fields = &doc.fields;

        let author_id = fields
            .get("authorId")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::Decode(format!("post {} has no authorId", doc.id)))?
            .to_string();

        let timestamp_ms = fields
            .get("timestamp")
            .and_then(timestamp_millis)
            .ok_or_else(|| RemoteError::Decode(format!("post {} has no timestamp", doc.id)))?;

        let status = match fields.get("status").and_then(Value::as_str) {
            Some(raw) => raw.parse()?,
            None => PostStatus::default(),
        };

        Ok(Self {
            id: doc.id.clone(),
            author_id,
            is_admin: fields.get("isAdmin").and_then(Value::as_bool).unwrap_or(false),
            like_count: counter(fields, "likeCount"),
            comment_count: counter(fields, "commentCount"),
            share_count: counter(fields, "shareCount"),
            timestamp_ms,
            status,
            content: fields
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// Reads a non-negative counter, treating absent or malformed values as 0.
fn counter(fields: &Map<String, Value>, name: &str) -> u64 {
    fields
        .get(name)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite() && *n > 0.0)
        .map_or(0, |n| n as u64)
}

/// Largest timestamp magnitude accepted at ingestion, in epoch milliseconds
/// (about 273,000 years either side of 1970).
pub const MAX_TIMESTAMP_MS: i64 = 8_640_000_000_000_000;

/// Accepts epoch milliseconds or a `{ seconds, nanoseconds }` timestamp object.
///
/// Values that are not finite, overflow, or fall outside `MAX_TIMESTAMP_MS`
/// are rejected.
fn timestamp_millis(value: &Value) -> Option<i64> {
    let millis = match value {
        Value::Number(n) => match n.as_i64() {
            Some(ms) => ms,
            None => {
                let f = n.as_f64().filter(|f| f.is_finite())?;
                if f.abs() > MAX_TIMESTAMP_MS as f64 {
                    return None;
                }
                f as i64
            }
        },
        Value::Object(obj) => {
            let seconds = obj.get("seconds").and_then(Value::as_i64)?;
            let nanos = obj.get("nanoseconds").and_then(Value::as_i64).unwrap_or(0);
            seconds.checked_mul(1_000)?.checked_add(nanos / 1_000_000)?
        }
        _ => return None,
    };
    (-MAX_TIMESTAMP_MS..=MAX_TIMESTAMP_MS)
        .contains(&millis)
        .then_some(millis)
}
