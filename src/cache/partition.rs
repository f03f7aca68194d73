//! Partition Module
//!
//! The fixed set of independently addressable stores inside the cache.

use std::fmt;

/// A named partition of the persistent cache, one per entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    BibleChapters,
    Posts,
    Media,
    UserData,
}

impl Partition {
    /// Every partition established by `initialize`.
    pub const ALL: [Partition; 4] = [
        Partition::BibleChapters,
        Partition::Posts,
        Partition::Media,
        Partition::UserData,
    ];

    /// Stable storage name of the partition.
    pub fn name(self) -> &'static str {
        match self {
            Partition::BibleChapters => "bible-chapters",
            Partition::Posts => "posts",
            Partition::Media => "media",
            Partition::UserData => "user-data",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
