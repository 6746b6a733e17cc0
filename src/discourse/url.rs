//! Thread URL resolution.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::IngestError;

static THREAD_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Where a thread lives: the forum origin and the numeric topic id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadLocator {
    /// Scheme, host and port, without a trailing slash.
    pub origin: String,
    pub thread_id: u64,
}

impl ThreadLocator {
    #[must_use]
    pub fn thread_json_url(&self) -> String {
        format!("{}/t/{}.json", self.origin, self.thread_id)
    }

    #[must_use]
    pub fn posts_json_url(&self) -> String {
        format!("{}/t/{}/posts.json", self.origin, self.thread_id)
    }

    #[must_use]
    pub fn like_users_url(&self) -> String {
        format!("{}/post_action_users.json", self.origin)
    }
}

/// Parse a thread URL into its origin and thread id.
///
/// Accepts `/t/<slug>/<id>` (optionally followed by a post number or more
/// segments) and the short `/t/<id>` form.
///
/// # Errors
///
/// Returns [`IngestError::InvalidUrl`] when the input is not an absolute
/// `http`/`https` URL, has no `t` segment, or the id segment is not all digits.
pub fn resolve_thread_url(input: &str) -> Result<ThreadLocator, IngestError> {
    let invalid = |reason| IngestError::InvalidUrl {
        input: input.to_string(),
        reason,
    };

    let url = Url::parse(input.trim()).map_err(|_| invalid("not an absolute URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("unsupported scheme"));
    }
    if !url.has_host() {
        return Err(invalid("URL has no host"));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    let t_index = segments
        .iter()
        .position(|s| *s == "t")
        .ok_or_else(|| invalid("no /t/ segment"))?;

    let candidate = match (segments.get(t_index + 1), segments.get(t_index + 2)) {
        (_, Some(id)) if !id.is_empty() => *id,
        (Some(id), _) => *id,
        (None, _) => return Err(invalid("no thread id after /t/")),
    };

    if !THREAD_ID.is_match(candidate) {
        return Err(invalid("thread id is not numeric"));
    }

    let thread_id = candidate
        .parse()
        .map_err(|_| invalid("thread id is out of range"))?;

    Ok(ThreadLocator {
        origin: url.origin().ascii_serialization(),
        thread_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_form() {
        let loc = resolve_thread_url("https://talk.nervos.org/t/some-topic/12345").unwrap();
        assert_eq!(loc.origin, "https://talk.nervos.org");
        assert_eq!(loc.thread_id, 12345);
    }

    #[test]
    fn test_slug_form_with_post_number_and_query() {
        let loc = resolve_thread_url(
            "https://forum.arbitrum.foundation/t/topic-name/12345/42?u=someone#reply",
        )
        .unwrap();
        assert_eq!(loc.origin, "https://forum.arbitrum.foundation");
        assert_eq!(loc.thread_id, 12345);
    }

    #[test]
    fn test_port_and_whitespace() {
        let loc = resolve_thread_url("  http://localhost:4200/t/x/7  ").unwrap();
        assert_eq!(loc.origin, "http://localhost:4200");
        assert_eq!(loc.thread_id, 7);
    }

    #[test]
    fn test_short_form() {
        let loc = resolve_thread_url("https://meta.discourse.org/t/999").unwrap();
        assert_eq!(loc.thread_id, 999);
    }

    #[test]
    fn test_rejects_non_numeric_id() {
        assert!(matches!(
            resolve_thread_url("https://meta.discourse.org/t/slug/abc"),
            Err(IngestError::InvalidUrl { .. })
        ));
        assert!(resolve_thread_url("https://meta.discourse.org/t/slug").is_err());
        assert!(resolve_thread_url("https://meta.discourse.org/t/slug/12a").is_err());
    }

    #[test]
    fn test_rejects_missing_t_segment() {
        assert!(resolve_thread_url("https://meta.discourse.org/c/general/12").is_err());
        assert!(resolve_thread_url("https://meta.discourse.org/").is_err());
        assert!(resolve_thread_url("https://meta.discourse.org/t/").is_err());
    }

    #[test]
    fn test_rejects_relative_or_garbage() {
        assert!(resolve_thread_url("/t/slug/1").is_err());
        assert!(resolve_thread_url("not a url").is_err());
        assert!(resolve_thread_url("").is_err());
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        for input in ["ftp://h/t/x/1", "ws://forum.example/t/x/1", "file:///t/x/1"] {
            match resolve_thread_url(input) {
                Err(IngestError::InvalidUrl { reason, .. }) => {
                    assert_eq!(reason, "unsupported scheme", "input: {input}");
                }
                other => panic!("expected InvalidUrl for {input}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_endpoint_urls() {
        let loc = resolve_thread_url("https://f.example/t/s/5").unwrap();
        assert_eq!(loc.thread_json_url(), "https://f.example/t/5.json");
        assert_eq!(loc.posts_json_url(), "https://f.example/t/5/posts.json");
        assert_eq!(loc.like_users_url(), "https://f.example/post_action_users.json");
    }
}
