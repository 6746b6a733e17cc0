//! Canonical thread and post types produced by an ingestion run.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role tag attached to a post's author at the time of posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoleTag {
    Admin,
    Mod,
    /// Trust level tag, only attached for senior levels (3 and up).
    Level(u32),
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("Admin"),
            Self::Mod => f.write_str("Mod"),
            Self::Level(level) => write!(f, "LV{level}"),
        }
    }
}

impl RoleTag {
    /// Parse a tag from its display form ("Admin", "Mod", "LV3").
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Admin" => Some(Self::Admin),
            "Mod" => Some(Self::Mod),
            _ => s
                .strip_prefix("LV")
                .and_then(|level| level.parse().ok())
                .map(Self::Level),
        }
    }
}

impl Serialize for RoleTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoleTag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown role tag '{s}'")))
    }
}

/// A normalized post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// 1-based position in the ingested stream.
    pub floor: usize,
    pub author: String,
    pub author_display_name: String,
    pub author_avatar: Option<String>,
    pub author_trust_level: u32,
    pub author_role_tags: BTreeSet<RoleTag>,
    pub body_text: String,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    pub read_count: u64,
    /// Usernames who liked the post; empty until the like lookup succeeds.
    pub liked_by: Vec<String>,
}

impl Post {
    #[must_use]
    pub fn has_tag(&self, tag: RoleTag) -> bool {
        self.author_role_tags.contains(&tag)
    }

    /// Whether the author was staff (admin or moderator) on this post.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.has_tag(RoleTag::Admin) || self.has_tag(RoleTag::Mod)
    }

    /// Whether the author carried a trust level tag on this post.
    #[must_use]
    pub fn is_senior(&self) -> bool {
        self.author_role_tags
            .iter()
            .any(|tag| matches!(tag, RoleTag::Level(_)))
    }
}

/// One ingested discussion thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub title: String,
    pub source_url: String,
    pub thread_id: u64,
    pub posts: Vec<Post>,
    /// Distinct post authors.
    pub participants: BTreeSet<String>,
}

impl Thread {
    #[must_use]
    pub fn new(title: String, source_url: String, thread_id: u64, posts: Vec<Post>) -> Self {
        let participants = posts.iter().map(|p| p.author.clone()).collect();
        Self {
            title,
            source_url,
            thread_id,
            posts,
            participants,
        }
    }
}
