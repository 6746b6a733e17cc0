//! The analysis document served by the JSON and HTML endpoints.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::AppState;
use crate::analytics::{anomalies, timeline, ThreadStats, TimelineBucket};
use crate::discourse::{FetchedThread, IngestError, LikeFetchFailure};
use crate::graph::{build_graph, AggregatedLink, SocialGraph};
use crate::model::{Post, Thread};
use crate::summary::ThreadSummary;

/// Everything derived from one ingested thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub thread: Thread,
    pub graph: SocialGraph,
    pub aggregated_links: Vec<AggregatedLink>,
    pub timeline: Vec<TimelineBucket>,
    pub anomalies: Vec<Post>,
    pub stats: ThreadStats,
    pub like_failures: Vec<LikeFetchFailure>,
    pub summary: ThreadSummary,
}

impl AnalysisReport {
    #[must_use]
    pub fn new(fetched: FetchedThread, summary: ThreadSummary) -> Self {
        let FetchedThread {
            thread,
            like_failures,
        } = fetched;
        let graph = build_graph(&thread.posts);

        Self {
            aggregated_links: graph.aggregated_links(),
            timeline: timeline(&thread.posts),
            anomalies: anomalies(&thread.posts).into_iter().cloned().collect(),
            stats: ThreadStats::from_posts(&thread.posts),
            graph,
            thread,
            like_failures,
            summary,
        }
    }
}

/// `thread-analysis-{id}-{YYYY-MM-DD}.json`
#[must_use]
pub fn export_filename(thread_id: u64, date: NaiveDate) -> String {
    format!("thread-analysis-{thread_id}-{}.json", date.format("%Y-%m-%d"))
}

/// The report for `url`, ingesting only when it is not cached or `refresh`
/// is set.
pub(super) async fn cached_or_analyze(
    state: &AppState,
    url: &str,
    refresh: bool,
) -> Result<Arc<AnalysisReport>, IngestError> {
    if !refresh {
        if let Some(report) = state.reports.get(url) {
            debug!(thread_id = report.thread.thread_id, "Serving cached report");
            return Ok(report);
        }
    }
    analyze(state, url).await
}

/// Ingest `url` on the shared run slot, build its report and cache it.
///
/// A summarizer failure is logged and leaves the summary empty.
pub(super) async fn analyze(
    state: &AppState,
    url: &str,
) -> Result<Arc<AnalysisReport>, IngestError> {
    let ticket = state.runs.begin();
    let result = state
        .fetcher
        .fetch_thread(url, &ticket.progress, &ticket.token)
        .await;
    state.runs.finish(&ticket);
    let fetched = result?;

    let summary = match state.summarizer.summarize(&fetched.thread).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!(summarizer = state.summarizer.name(), "Summary unavailable: {e:#}");
            ThreadSummary::default()
        }
    };

    let report = AnalysisReport::new(fetched, summary);
    info!(
        thread_id = report.thread.thread_id,
        nodes = report.graph.nodes.len(),
        links = report.graph.links.len(),
        anomalies = report.anomalies.len(),
        "Analysis ready"
    );
    Ok(state.reports.store(url, report))
}
