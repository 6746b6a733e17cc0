//! Integration tests for thread ingestion against a fake forum.

mod common;

use std::time::Duration;

use common::{
    mount_likers, mount_likers_error, mount_thread, requested_ids, thread_url, FakePost, THREAD_ID,
};
use reqwest::StatusCode;
use thread_graph_explorer::discourse::{
    FetchSettings, IngestError, ProgressLog, RunSlot, ThreadFetcher,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(batch_size: usize) -> ThreadFetcher {
    ThreadFetcher::with_client(
        reqwest::Client::new(),
        FetchSettings {
            batch_size,
            batch_delay: Duration::ZERO,
            like_delay: Duration::ZERO,
        },
    )
}

fn paced_fetcher(batch_size: usize, batch_delay: Duration, like_delay: Duration) -> ThreadFetcher {
    ThreadFetcher::with_client(
        reqwest::Client::new(),
        FetchSettings {
            batch_size,
            batch_delay,
            like_delay,
        },
    )
}

fn numbered_posts(count: i64) -> Vec<FakePost> {
    (1..=count)
        .map(|id| FakePost::new(id, &format!("user{}", id % 5)))
        .collect()
}

#[tokio::test]
async fn test_batches_requested_sequentially_in_order() {
    let server = MockServer::start().await;
    mount_thread(&server, &numbered_posts(45), None).await;

    let progress = ProgressLog::default();
    let fetched = fetcher(20)
        .fetch_thread(&thread_url(&server), &progress, &CancellationToken::new())
        .await
        .expect("ingestion should succeed");

    let requests = server.received_requests().await.expect("recording enabled");
    let batches: Vec<Vec<i64>> = requests
        .iter()
        .filter(|r| r.url.path().ends_with("/posts.json"))
        .map(requested_ids)
        .collect();

    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![20, 20, 5]);
    assert_eq!(batches.concat(), (1..=45).collect::<Vec<_>>());

    let thread = &fetched.thread;
    assert_eq!(thread.thread_id, THREAD_ID);
    assert_eq!(thread.title, "A lively thread");
    assert_eq!(thread.posts.len(), 45);
    for (i, post) in thread.posts.iter().enumerate() {
        assert_eq!(post.floor, i + 1);
        assert_eq!(post.id, i as i64 + 1);
    }
    assert_eq!(thread.participants.len(), 5);
    assert!(fetched.like_failures.is_empty());

    // No post had likes, so no like lookups were made.
    assert!(!requests
        .iter()
        .any(|r| r.url.path() == "/post_action_users.json"));

    assert_eq!(progress.lines().last().map(String::as_str), Some("Analysis complete!"));
}

#[tokio::test]
async fn test_posts_are_normalized() {
    let server = MockServer::start().await;
    let mut admin = FakePost::new(1, "alice").likes(1);
    admin.admin = true;
    admin.trust_level = 4;
    mount_thread(&server, &[admin, FakePost::new(2, "bob")], None).await;
    mount_likers(&server, 1, &["bob"]).await;

    let fetched = fetcher(20)
        .fetch_thread(&thread_url(&server), &ProgressLog::default(), &CancellationToken::new())
        .await
        .unwrap();

    let first = &fetched.thread.posts[0];
    assert_eq!(first.author_display_name, "alice display");
    assert_eq!(first.body_text, "Post 1");
    assert_eq!(
        first.author_avatar.as_deref(),
        Some("/user_avatar/forum/alice/48/1.png")
    );
    assert_eq!(
        first
            .author_role_tags
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        vec!["Admin", "LV4"]
    );
    assert_eq!(first.liked_by, vec!["bob"]);
    assert!(fetched.thread.posts[1].author_role_tags.is_empty());
}

#[tokio::test]
async fn test_like_failure_is_recorded_not_fatal() {
    let server = MockServer::start().await;
    let posts = vec![
        FakePost::new(1, "alice"),
        FakePost::new(2, "bob").likes(2),
        FakePost::new(3, "carol").likes(1),
    ];
    mount_thread(&server, &posts, None).await;
    mount_likers_error(&server, 2, 500).await;
    mount_likers(&server, 3, &["alice"]).await;

    let fetched = fetcher(20)
        .fetch_thread(&thread_url(&server), &ProgressLog::default(), &CancellationToken::new())
        .await
        .expect("like failures must not abort the run");

    assert_eq!(fetched.like_failures.len(), 1);
    let failure = &fetched.like_failures[0];
    assert_eq!(failure.post_id, 2);
    assert_eq!(failure.floor, 2);
    assert!(failure.reason.contains("500"), "reason: {}", failure.reason);

    let posts = &fetched.thread.posts;
    assert!(posts[1].liked_by.is_empty());
    assert_eq!(posts[1].like_count, 2);
    assert_eq!(posts[2].liked_by, vec!["alice"]);
}

#[tokio::test]
async fn test_thread_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/t/{THREAD_ID}.json")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = fetcher(20)
        .fetch_thread(&thread_url(&server), &ProgressLog::default(), &CancellationToken::new())
        .await;

    match result {
        Err(IngestError::ThreadFetch { status }) => assert_eq!(status, StatusCode::NOT_FOUND),
        other => panic!("expected ThreadFetch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_batch_aborts_with_index() {
    let server = MockServer::start().await;
    mount_thread(&server, &numbered_posts(5), Some(3)).await;

    let result = fetcher(2)
        .fetch_thread(&thread_url(&server), &ProgressLog::default(), &CancellationToken::new())
        .await;

    match result {
        Err(IngestError::PostBatchFetch {
            status,
            batch_index,
        }) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(batch_index, 1);
        }
        other => panic!("expected PostBatchFetch, got {other:?}"),
    }

    // The third batch was never requested.
    let requests = server.received_requests().await.unwrap();
    let batch_calls = requests
        .iter()
        .filter(|r| r.url.path().ends_with("/posts.json"))
        .count();
    assert_eq!(batch_calls, 2);
}

#[tokio::test]
async fn test_malformed_topic_body_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/t/{THREAD_ID}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let result = fetcher(20)
        .fetch_thread(&thread_url(&server), &ProgressLog::default(), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(IngestError::Http { .. })));
}

#[tokio::test]
async fn test_cancellation_interrupts_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/t/{THREAD_ID}.json")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"title": "slow", "post_stream": {"stream": []}}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let result = fetcher(20)
        .fetch_thread(&thread_url(&server), &ProgressLog::default(), &token)
        .await;

    assert!(matches!(result, Err(IngestError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_new_run_cancels_in_flight_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/t/{THREAD_ID}.json")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"title": "slow", "post_stream": {"stream": []}}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let slot = RunSlot::new();
    let first = slot.begin();
    let url = thread_url(&server);
    let handle = tokio::spawn({
        let first = first.clone();
        async move {
            fetcher(20)
                .fetch_thread(&url, &first.progress, &first.token)
                .await
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = slot.begin();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(IngestError::Cancelled)));
    assert!(!second.token.is_cancelled());

    slot.finish(&first);
    assert!(slot.is_busy());
    slot.finish(&second);
    assert!(!slot.is_busy());
}

#[tokio::test]
async fn test_empty_thread() {
    let server = MockServer::start().await;
    mount_thread(&server, &[], None).await;

    let fetched = fetcher(20)
        .fetch_thread(&thread_url(&server), &ProgressLog::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(fetched.thread.posts.is_empty());
    assert!(fetched.thread.participants.is_empty());
}

#[tokio::test]
async fn test_batch_delay_only_between_batches() {
    let server = MockServer::start().await;
    mount_thread(&server, &numbered_posts(45), None).await;

    let delay = Duration::from_millis(150);
    let started = std::time::Instant::now();
    paced_fetcher(20, delay, Duration::ZERO)
        .fetch_thread(&thread_url(&server), &ProgressLog::default(), &CancellationToken::new())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // Three batches, two gaps.
    assert!(elapsed >= delay * 2, "elapsed {elapsed:?}");
    assert!(elapsed < delay * 3, "elapsed {elapsed:?}");
}

#[tokio::test]
async fn test_like_delay_follows_each_lookup() {
    let server = MockServer::start().await;
    let posts = vec![
        FakePost::new(1, "alice").likes(1),
        FakePost::new(2, "bob"),
        FakePost::new(3, "carol"),
        FakePost::new(4, "dave").likes(1),
        FakePost::new(5, "erin"),
    ];
    mount_thread(&server, &posts, None).await;
    mount_likers(&server, 1, &["bob"]).await;
    mount_likers(&server, 4, &["erin"]).await;

    let delay = Duration::from_millis(150);
    let started = std::time::Instant::now();
    let fetched = paced_fetcher(20, Duration::ZERO, delay)
        .fetch_thread(&thread_url(&server), &ProgressLog::default(), &CancellationToken::new())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(fetched.thread.posts[3].liked_by, vec!["erin"]);
    // Two posts have likes; the other three are never looked up.
    assert!(elapsed >= delay * 2, "elapsed {elapsed:?}");
    assert!(elapsed < delay * 3, "elapsed {elapsed:?}");

    let requests = server.received_requests().await.unwrap();
    let lookups = requests
        .iter()
        .filter(|r| r.url.path() == "/post_action_users.json")
        .count();
    assert_eq!(lookups, 2);
}
