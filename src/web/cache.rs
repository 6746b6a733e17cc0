//! Last-report cache.
//!
//! Viewing a report (hovering, zooming, filtering) must not re-ingest the
//! thread, so the most recent report is kept here until another thread is
//! analyzed or a refresh is asked for.

use std::sync::{Arc, PoisonError, RwLock};

use super::AnalysisReport;
use crate::discourse::resolve_thread_url;

struct CachedReport {
    key: String,
    report: Arc<AnalysisReport>,
}

/// Holds the report of the most recently analyzed thread.
#[derive(Default)]
pub struct ReportCache {
    entry: RwLock<Option<CachedReport>>,
}

impl ReportCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached report for `url`, if it is the thread analyzed last.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<Arc<AnalysisReport>> {
        let key = cache_key(url);
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|cached| cached.key == key)
            .map(|cached| Arc::clone(&cached.report))
    }

    /// Replace the cached report with the one for `url`.
    pub fn store(&self, url: &str, report: AnalysisReport) -> Arc<AnalysisReport> {
        let report = Arc::new(report);
        let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        *entry = Some(CachedReport {
            key: cache_key(url),
            report: Arc::clone(&report),
        });
        report
    }
}

/// Different spellings of the same thread URL share one entry.
fn cache_key(url: &str) -> String {
    resolve_thread_url(url).map_or_else(
        |_| url.trim().to_string(),
        |locator| format!("{}/t/{}", locator.origin, locator.thread_id),
    )
}
