//! Raw Discourse JSON API records.
//!
//! Only the fields the pipeline consumes are declared; every field that can
//! be missing on some installs is defaulted.

use serde::Deserialize;

/// Response of `GET /t/{id}.json`.
#[derive(Debug, Deserialize)]
pub struct TopicResponse {
    #[serde(default)]
    pub title: String,
    pub post_stream: TopicPostStream,
}

#[derive(Debug, Deserialize)]
pub struct TopicPostStream {
    /// Every post id in the thread, in display order.
    #[serde(default)]
    pub stream: Vec<i64>,
}

/// Response of `GET /t/{id}/posts.json?post_ids[]=...`.
#[derive(Debug, Deserialize)]
pub struct PostsResponse {
    pub post_stream: PostBatch,
}

#[derive(Debug, Deserialize)]
pub struct PostBatch {
    #[serde(default)]
    pub posts: Vec<RawPost>,
}

/// A single post as returned by Discourse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPost {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_template: Option<String>,
    #[serde(default)]
    pub trust_level: Option<u32>,
    #[serde(default)]
    pub admin: Option<bool>,
    #[serde(default)]
    pub moderator: Option<bool>,
    #[serde(default)]
    pub cooked: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub actions_summary: Vec<ActionSummary>,
    #[serde(default)]
    pub reads: Option<u64>,
}

/// Per-action counters attached to a post (likes, flags, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct ActionSummary {
    pub id: i64,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Response of `GET /post_action_users.json?id=..&post_action_type_id=2`.
#[derive(Debug, Deserialize)]
pub struct PostActionUsersResponse {
    #[serde(default)]
    pub post_action_users: Vec<PostActionUser>,
}

#[derive(Debug, Deserialize)]
pub struct PostActionUser {
    pub username: String,
}
