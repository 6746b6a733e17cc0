//! Sequential, rate-friendly retrieval of a whole thread.

use std::future::Future;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::api::{PostActionUsersResponse, PostsResponse, RawPost, TopicResponse};
use super::{normalize_post, resolve_thread_url, IngestError, ProgressLog, ThreadLocator};
use crate::config::{Config, HttpSettings};
use crate::constants::{DEFAULT_BATCH_SIZE, LIKE_ACTION_TYPE_ID};
use crate::model::{Post, Thread};

/// Pacing of upstream requests.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Post ids per `posts.json` request.
    pub batch_size: usize,
    /// Pause between consecutive post batches.
    pub batch_delay: Duration,
    /// Pause after each like lookup.
    pub like_delay: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: Duration::from_millis(200),
            like_delay: Duration::from_millis(50),
        }
    }
}

impl FetchSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            batch_delay: config.batch_delay,
            like_delay: config.like_delay,
        }
    }
}

/// A post whose liked-by list could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeFetchFailure {
    pub post_id: i64,
    pub floor: usize,
    pub reason: String,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct FetchedThread {
    pub thread: Thread,
    /// Like lookups that failed; those posts keep an empty `liked_by`.
    pub like_failures: Vec<LikeFetchFailure>,
}

/// Fetches threads one request at a time.
#[derive(Debug, Clone)]
pub struct ThreadFetcher {
    client: Client,
    settings: FetchSettings,
}

impl ThreadFetcher {
    /// Create a fetcher with a client built from `http`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(http: &HttpSettings, settings: FetchSettings) -> Result<Self, IngestError> {
        let client = http
            .build_client()
            .map_err(|e| IngestError::http("Failed to build HTTP client", e))?;
        Ok(Self::with_client(client, settings))
    }

    #[must_use]
    pub fn with_client(client: Client, mut settings: FetchSettings) -> Self {
        settings.batch_size = settings.batch_size.max(1);
        Self { client, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Ingest the thread at `input`.
    ///
    /// Batches and like lookups run strictly one after another. A failed
    /// like lookup is recorded in [`FetchedThread::like_failures`] and the
    /// run continues; every other failure aborts the run.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidUrl`] before any network activity for a
    /// malformed URL, [`IngestError::ThreadFetch`] or
    /// [`IngestError::PostBatchFetch`] for a non-success upstream status,
    /// [`IngestError::Http`] for transport or decode failures, and
    /// [`IngestError::Cancelled`] if `cancel` fires.
    pub async fn fetch_thread(
        &self,
        input: &str,
        progress: &ProgressLog,
        cancel: &CancellationToken,
    ) -> Result<FetchedThread, IngestError> {
        let locator = resolve_thread_url(input)?;
        info!(origin = %locator.origin, thread_id = locator.thread_id, "Starting thread ingestion");

        progress.push("Fetching topic info...");
        let topic = self.fetch_topic(&locator, cancel).await?;
        let ids = topic.post_stream.stream;
        progress.push(format!("Total {} posts", ids.len()));

        let raw_posts = self.fetch_posts(&locator, &ids, progress, cancel).await?;
        progress.push(format!("Loaded {} posts", raw_posts.len()));

        let mut posts: Vec<Post> = raw_posts
            .iter()
            .enumerate()
            .map(|(index, raw)| normalize_post(raw, index + 1))
            .collect();

        progress.push("Fetching likes data...");
        let like_failures = self
            .fill_liked_by(&locator, &mut posts, progress, cancel)
            .await?;

        progress.push("Analysis complete!");
        info!(
            thread_id = locator.thread_id,
            posts = posts.len(),
            like_failures = like_failures.len(),
            "Thread ingestion complete"
        );

        Ok(FetchedThread {
            thread: Thread::new(
                topic.title,
                input.trim().to_string(),
                locator.thread_id,
                posts,
            ),
            like_failures,
        })
    }

    async fn fetch_topic(
        &self,
        locator: &ThreadLocator,
        cancel: &CancellationToken,
    ) -> Result<TopicResponse, IngestError> {
        let request = self
            .client
            .get(locator.thread_json_url())
            .header(ACCEPT, "application/json")
            .send();
        let response = until_cancelled(cancel, request)
            .await?
            .map_err(|e| IngestError::http("Failed to fetch thread metadata", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::ThreadFetch { status });
        }

        until_cancelled(cancel, response.json::<TopicResponse>())
            .await?
            .map_err(|e| IngestError::http("Failed to decode thread metadata", e))
    }

    async fn fetch_posts(
        &self,
        locator: &ThreadLocator,
        ids: &[i64],
        progress: &ProgressLog,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawPost>, IngestError> {
        let batch_size = self.settings.batch_size;
        let mut posts = Vec::with_capacity(ids.len());

        for (batch_index, chunk) in ids.chunks(batch_size).enumerate() {
            if batch_index > 0 {
                until_cancelled(cancel, tokio::time::sleep(self.settings.batch_delay)).await?;
            }

            let first = batch_index * batch_size + 1;
            let last = first + chunk.len() - 1;
            progress.push(format!("Loading posts {first}-{last}..."));

            let query: Vec<(&str, i64)> = chunk.iter().map(|id| ("post_ids[]", *id)).collect();
            let request = self
                .client
                .get(locator.posts_json_url())
                .header(ACCEPT, "application/json")
                .query(&query)
                .send();
            let response = until_cancelled(cancel, request)
                .await?
                .map_err(|e| IngestError::http(format!("Failed to fetch post batch {batch_index}"), e))?;

            let status = response.status();
            if !status.is_success() {
                warn!(batch_index, %status, "Post batch fetch failed");
                return Err(IngestError::PostBatchFetch {
                    status,
                    batch_index,
                });
            }

            let batch = until_cancelled(cancel, response.json::<PostsResponse>())
                .await?
                .map_err(|e| IngestError::http(format!("Failed to decode post batch {batch_index}"), e))?;

            debug!(
                batch_index,
                requested = chunk.len(),
                received = batch.post_stream.posts.len(),
                "Fetched post batch"
            );
            posts.extend(batch.post_stream.posts);
        }

        Ok(posts)
    }

    async fn fill_liked_by(
        &self,
        locator: &ThreadLocator,
        posts: &mut [Post],
        progress: &ProgressLog,
        cancel: &CancellationToken,
    ) -> Result<Vec<LikeFetchFailure>, IngestError> {
        let mut failures = Vec::new();

        for post in posts.iter_mut().filter(|p| p.like_count > 0) {
            progress.push(format!("#{} with {} likes", post.floor, post.like_count));

            match self.fetch_likers(locator, post.id, cancel).await {
                Ok(users) => post.liked_by = users,
                Err(IngestError::Cancelled) => return Err(IngestError::Cancelled),
                Err(e) => {
                    warn!(post_id = post.id, floor = post.floor, "Failed to fetch likes: {e}");
                    failures.push(LikeFetchFailure {
                        post_id: post.id,
                        floor: post.floor,
                        reason: e.to_string(),
                    });
                }
            }

            until_cancelled(cancel, tokio::time::sleep(self.settings.like_delay)).await?;
        }

        Ok(failures)
    }

    async fn fetch_likers(
        &self,
        locator: &ThreadLocator,
        post_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, IngestError> {
        let request = self
            .client
            .get(locator.like_users_url())
            .header(ACCEPT, "application/json")
            .query(&[("id", post_id), ("post_action_type_id", LIKE_ACTION_TYPE_ID)])
            .send();
        let response = until_cancelled(cancel, request)
            .await?
            .map_err(|e| IngestError::http("Like lookup request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::LikeFetch { status, post_id });
        }

        let body = until_cancelled(cancel, response.json::<PostActionUsersResponse>())
            .await?
            .map_err(|e| IngestError::http("Failed to decode like list", e))?;

        Ok(body
            .post_action_users
            .into_iter()
            .map(|u| u.username)
            .collect())
    }
}

/// Race `fut` against cancellation of the run.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, IngestError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(IngestError::Cancelled),
        output = fut => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_until_cancelled_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let result = until_cancelled(&token, std::future::pending::<()>()).await;
        assert!(matches!(result, Err(IngestError::Cancelled)));
    }

    #[tokio::test]
    async fn test_until_cancelled_passes_output() {
        let token = CancellationToken::new();
        let result = until_cancelled(&token, async { 7 }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_invalid_url_before_network() {
        let fetcher = ThreadFetcher::with_client(Client::new(), FetchSettings::default());
        let progress = ProgressLog::default();
        let result = fetcher
            .fetch_thread("https://example.com/c/7", &progress, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(IngestError::InvalidUrl { .. })));
        assert!(progress.lines().is_empty());
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let fetcher = ThreadFetcher::with_client(
            Client::new(),
            FetchSettings {
                batch_size: 0,
                ..FetchSettings::default()
            },
        );
        assert_eq!(fetcher.settings().batch_size, 1);
    }
}
