use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use scraper::Html;

use super::api::RawPost;
use crate::constants::LIKE_ACTION_TYPE_ID;
use crate::model::{Post, RoleTag};

/// Lowest trust level that earns an `LV{n}` tag.
const SENIOR_TRUST_LEVEL: u32 = 3;

/// Map a raw post to the canonical shape. `floor` is its 1-based position in
/// the ingested stream.
#[must_use]
pub fn normalize_post(raw: &RawPost, floor: usize) -> Post {
    let trust_level = raw.trust_level.unwrap_or(0);

    Post {
        id: raw.id,
        floor,
        author: raw.username.clone(),
        author_display_name: raw
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&raw.username)
            .to_string(),
        author_avatar: raw
            .avatar_template
            .as_deref()
            .map(|t| t.replace("{size}", "48")),
        author_trust_level: trust_level,
        author_role_tags: role_tags(raw.admin, raw.moderator, trust_level),
        body_text: strip_html(raw.cooked.as_deref().unwrap_or_default()),
        created_at: parse_timestamp(raw.created_at.as_deref()),
        like_count: like_count(raw),
        read_count: raw.reads.unwrap_or(0),
        liked_by: Vec::new(),
    }
}

fn role_tags(admin: Option<bool>, moderator: Option<bool>, trust_level: u32) -> BTreeSet<RoleTag> {
    let mut tags = BTreeSet::new();
    if admin.unwrap_or(false) {
        tags.insert(RoleTag::Admin);
    }
    if moderator.unwrap_or(false) {
        tags.insert(RoleTag::Mod);
    }
    if trust_level >= SENIOR_TRUST_LEVEL {
        tags.insert(RoleTag::Level(trust_level));
    }
    tags
}

fn like_count(raw: &RawPost) -> u64 {
    raw.actions_summary
        .iter()
        .find(|a| a.id == LIKE_ACTION_TYPE_ID)
        .and_then(|a| a.count)
        .unwrap_or(0)
}

fn parse_timestamp(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Strip markup from cooked post HTML, keeping text content.
#[must_use]
pub fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discourse::api::ActionSummary;

    fn raw(id: i64) -> RawPost {
        RawPost {
            id,
            username: "alice".to_string(),
            ..RawPost::default()
        }
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let post = normalize_post(&raw(5), 1);
        assert_eq!(post.id, 5);
        assert_eq!(post.floor, 1);
        assert_eq!(post.author, "alice");
        assert_eq!(post.author_display_name, "alice");
        assert_eq!(post.author_trust_level, 0);
        assert!(post.author_role_tags.is_empty());
        assert_eq!(post.like_count, 0);
        assert_eq!(post.read_count, 0);
        assert!(post.body_text.is_empty());
        assert_eq!(post.created_at, DateTime::<Utc>::default());
        assert!(post.liked_by.is_empty());
    }

    #[test]
    fn test_role_tags_from_flags() {
        let mut r = raw(1);
        r.admin = Some(true);
        r.moderator = Some(true);
        r.trust_level = Some(4);
        let post = normalize_post(&r, 3);
        assert!(post.has_tag(RoleTag::Admin));
        assert!(post.has_tag(RoleTag::Mod));
        assert!(post.has_tag(RoleTag::Level(4)));

        r.admin = None;
        r.moderator = Some(false);
        r.trust_level = Some(2);
        let post = normalize_post(&r, 3);
        assert!(post.author_role_tags.is_empty());
        assert_eq!(post.author_trust_level, 2);
    }

    #[test]
    fn test_like_count_uses_like_action() {
        let mut r = raw(1);
        r.actions_summary = vec![
            ActionSummary { id: 6, count: Some(9) },
            ActionSummary { id: 2, count: Some(4) },
        ];
        assert_eq!(normalize_post(&r, 1).like_count, 4);

        r.actions_summary = vec![ActionSummary { id: 2, count: None }];
        assert_eq!(normalize_post(&r, 1).like_count, 0);
    }

    #[test]
    fn test_display_name_and_avatar() {
        let mut r = raw(1);
        r.name = Some("Alice A.".to_string());
        r.avatar_template = Some("/user_avatar/f/alice/{size}/1.png".to_string());
        let post = normalize_post(&r, 1);
        assert_eq!(post.author_display_name, "Alice A.");
        assert_eq!(
            post.author_avatar.as_deref(),
            Some("/user_avatar/f/alice/48/1.png")
        );

        r.name = Some("  ".to_string());
        assert_eq!(normalize_post(&r, 1).author_display_name, "alice");
    }

    #[test]
    fn test_timestamp_parse() {
        let mut r = raw(1);
        r.created_at = Some("2024-01-02T03:04:05.678Z".to_string());
        let post = normalize_post(&r, 1);
        assert_eq!(post.created_at.to_rfc3339(), "2024-01-02T03:04:05.678+00:00");

        r.created_at = Some("yesterday".to_string());
        assert_eq!(normalize_post(&r, 1).created_at, DateTime::<Utc>::default());
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Hello <strong>world</strong> &amp; friends</p>"),
            "Hello world & friends"
        );
        assert_eq!(strip_html(""), "");
        assert_eq!(strip_html("plain"), "plain");
    }
}
