//! Read-only folds over a thread's posts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Post, RoleTag};

/// Posts with more reads than this and no likes are anomalous.
const SILENT_READS: u64 = 50;
/// Posts with more reads than this are anomalous below [`MIN_LIKE_RATIO`].
const POPULAR_READS: u64 = 100;
const MIN_LIKE_RATIO: f64 = 0.01;

/// Activity on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineBucket {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub post_count: u64,
    pub like_sum: u64,
}

/// Bucket posts by the UTC date they were created, ascending.
#[must_use]
pub fn timeline(posts: &[Post]) -> Vec<TimelineBucket> {
    let mut buckets: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for post in posts {
        let date = post.created_at.format("%Y-%m-%d").to_string();
        let entry = buckets.entry(date).or_default();
        entry.0 += 1;
        entry.1 += post.like_count;
    }

    buckets
        .into_iter()
        .map(|(date, (post_count, like_sum))| TimelineBucket {
            date,
            post_count,
            like_sum,
        })
        .collect()
}

/// Whether a post was read a lot but hardly liked.
#[must_use]
pub fn is_anomalous(post: &Post) -> bool {
    let silent = post.read_count > SILENT_READS && post.like_count == 0;
    let unpopular = post.read_count > POPULAR_READS
        && (post.like_count as f64 / post.read_count as f64) < MIN_LIKE_RATIO;
    silent || unpopular
}

/// Anomalous posts in floor order.
#[must_use]
pub fn anomalies(posts: &[Post]) -> Vec<&Post> {
    posts.iter().filter(|p| is_anomalous(p)).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadStats {
    pub total_posts: usize,
    pub total_likes: u64,
    /// Distinct authors.
    pub participants: usize,
    /// Posts written while the author carried an Admin or Mod tag.
    pub staff_posts: usize,
}

impl ThreadStats {
    #[must_use]
    pub fn from_posts(posts: &[Post]) -> Self {
        let mut authors: Vec<&str> = posts.iter().map(|p| p.author.as_str()).collect();
        authors.sort_unstable();
        authors.dedup();

        Self {
            total_posts: posts.len(),
            total_likes: posts.iter().map(|p| p.like_count).sum(),
            participants: authors.len(),
            staff_posts: posts.iter().filter(|p| p.is_staff()).count(),
        }
    }
}

/// Which authors a post list is narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleFilter {
    #[default]
    All,
    Admin,
    Mod,
    /// Any trust-level tag.
    Senior,
}

impl RoleFilter {
    #[must_use]
    pub fn matches(self, post: &Post) -> bool {
        match self {
            Self::All => true,
            Self::Admin => post.has_tag(RoleTag::Admin),
            Self::Mod => post.has_tag(RoleTag::Mod),
            Self::Senior => post.is_senior(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    Floor,
    /// Most liked first.
    Likes,
    /// Most read first.
    Reads,
}

#[must_use]
pub fn filter_posts(posts: &[Post], filter: RoleFilter) -> Vec<&Post> {
    posts.iter().filter(|p| filter.matches(p)).collect()
}

/// Sort in place. Ties keep floor order.
pub fn sort_posts(posts: &mut [&Post], sort: PostSort) {
    match sort {
        PostSort::Floor => posts.sort_by_key(|p| p.floor),
        PostSort::Likes => posts.sort_by(|a, b| b.like_count.cmp(&a.like_count)),
        PostSort::Reads => posts.sort_by(|a, b| b.read_count.cmp(&a.read_count)),
    }
}
