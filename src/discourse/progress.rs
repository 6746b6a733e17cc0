//! Bounded progress log for a running ingestion.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::constants::PROGRESS_LINES;

/// Human-readable status lines for the current run.
///
/// Only the newest lines are retained so a long run never grows the log.
/// Clones share the same buffer, which lets a request handler read progress
/// while the fetch task writes it.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl Default for ProgressLog {
    fn default() -> Self {
        Self::new(PROGRESS_LINES)
    }
}

impl ProgressLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append a line, evicting the oldest one past capacity.
    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        info!(progress = %line, "Ingestion progress");
        let mut lines = self
            .lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Current lines, oldest first.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}
