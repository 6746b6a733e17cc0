use reqwest::StatusCode;
use thiserror::Error;

/// Run-level ingestion failure. Any of these aborts the run and no thread is
/// published.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid thread URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: &'static str },
    #[error("failed to fetch thread metadata: HTTP {status}")]
    ThreadFetch { status: StatusCode },
    #[error("failed to fetch post batch {batch_index}: HTTP {status}")]
    PostBatchFetch {
        status: StatusCode,
        batch_index: usize,
    },
    /// Liked-by lookup failure. Recorded per post and never aborts a run.
    #[error("failed to fetch likes for post {post_id}: HTTP {status}")]
    LikeFetch { status: StatusCode, post_id: i64 },
    #[error("{context}: {source}")]
    Http {
        context: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("run was cancelled")]
    Cancelled,
}

impl IngestError {
    pub(crate) fn http(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            context: context.into(),
            source,
        }
    }

    /// Whether the failure came from the caller's input rather than upstream.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidUrl { .. })
    }
}
