//! Fake Discourse forum for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const THREAD_ID: u64 = 77;

/// Shape of one fake post.
#[derive(Debug, Clone)]
pub struct FakePost {
    pub id: i64,
    pub username: String,
    pub trust_level: u32,
    pub admin: bool,
    pub moderator: bool,
    pub likes: u64,
    pub reads: u64,
    pub created_at: String,
}

impl FakePost {
    pub fn new(id: i64, username: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            trust_level: 1,
            admin: false,
            moderator: false,
            likes: 0,
            reads: 10,
            created_at: "2024-01-01T10:00:00Z".to_string(),
        }
    }

    #[must_use]
    pub fn likes(mut self, likes: u64) -> Self {
        self.likes = likes;
        self
    }

    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "name": format!("{} display", self.username),
            "avatar_template": format!("/user_avatar/forum/{}/{{size}}/1.png", self.username),
            "trust_level": self.trust_level,
            "admin": self.admin,
            "moderator": self.moderator,
            "cooked": format!("<p>Post <b>{}</b></p>", self.id),
            "created_at": self.created_at,
            "reads": self.reads,
            "actions_summary": [{"id": 2, "count": self.likes}],
        })
    }
}

/// Answers `posts.json` with whichever posts were asked for, optionally
/// failing any batch that contains `fail_on`.
pub struct PostsResponder {
    posts: HashMap<i64, FakePost>,
    fail_on: Option<i64>,
}

impl Respond for PostsResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let ids = requested_ids(request);
        if self.fail_on.is_some_and(|id| ids.contains(&id)) {
            return ResponseTemplate::new(500);
        }
        let posts: Vec<Value> = ids
            .iter()
            .filter_map(|id| self.posts.get(id))
            .map(FakePost::to_json)
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "post_stream": { "posts": posts } }))
    }
}

/// The `post_ids[]` values of a `posts.json` request, in order.
pub fn requested_ids(request: &Request) -> Vec<i64> {
    request
        .url
        .query_pairs()
        .filter(|(k, _)| k == "post_ids[]")
        .filter_map(|(_, v)| v.parse().ok())
        .collect()
}

pub fn thread_url(server: &MockServer) -> String {
    format!("{}/t/some-topic/{THREAD_ID}", server.uri())
}

/// Mount the topic and posts endpoints for `posts`.
pub async fn mount_thread(server: &MockServer, posts: &[FakePost], fail_on: Option<i64>) {
    let stream: Vec<i64> = posts.iter().map(|p| p.id).collect();
    Mock::given(method("GET"))
        .and(path(format!("/t/{THREAD_ID}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "A lively thread",
            "post_stream": { "stream": stream },
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/t/{THREAD_ID}/posts.json")))
        .respond_with(PostsResponder {
            posts: posts.iter().map(|p| (p.id, p.clone())).collect(),
            fail_on,
        })
        .mount(server)
        .await;
}

/// Mount the liked-by list of one post.
pub async fn mount_likers(server: &MockServer, post_id: i64, likers: &[&str]) {
    let users: Vec<Value> = likers.iter().map(|u| json!({ "username": u })).collect();
    Mock::given(method("GET"))
        .and(path("/post_action_users.json"))
        .and(query_param("id", post_id.to_string()))
        .and(query_param("post_action_type_id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "post_action_users": users,
        })))
        .mount(server)
        .await;
}

/// Make the liked-by lookup of one post fail with `status`.
pub async fn mount_likers_error(server: &MockServer, post_id: i64, status: u16) {
    Mock::given(method("GET"))
        .and(path("/post_action_users.json"))
        .and(query_param("id", post_id.to_string()))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
