//! Single-slot ownership of the in-flight ingestion run.

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::ProgressLog;

/// Handle for one run started on a [`RunSlot`].
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub id: u64,
    pub token: CancellationToken,
    pub progress: ProgressLog,
}

#[derive(Debug, Default)]
struct SlotState {
    next_id: u64,
    current: Option<RunTicket>,
    /// Progress of the most recently started run, kept after it finishes.
    latest: ProgressLog,
}

/// Holds at most one active run. Starting a new run cancels the previous
/// one at its next suspension point.
#[derive(Debug, Default)]
pub struct RunSlot {
    state: Mutex<SlotState>,
}

impl RunSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run, cancelling whichever run was in flight.
    pub fn begin(&self) -> RunTicket {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(previous) = state.current.take() {
            info!(run_id = previous.id, "Cancelling in-flight run");
            previous.token.cancel();
        }

        state.next_id += 1;
        let ticket = RunTicket {
            id: state.next_id,
            token: CancellationToken::new(),
            progress: ProgressLog::default(),
        };
        state.latest = ticket.progress.clone();
        state.current = Some(ticket.clone());
        ticket
    }

    /// Release the slot if `ticket` is still the current run.
    pub fn finish(&self, ticket: &RunTicket) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.current.as_ref().is_some_and(|c| c.id == ticket.id) {
            state.current = None;
        }
    }

    /// Progress lines of the latest run, whether or not it is still going.
    #[must_use]
    pub fn progress(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .latest
            .lines()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .current
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_cancels_previous() {
        let slot = RunSlot::new();
        let first = slot.begin();
        assert!(!first.token.is_cancelled());

        let second = slot.begin();
        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_stale_finish_keeps_current_run() {
        let slot = RunSlot::new();
        let first = slot.begin();
        let second = slot.begin();

        slot.finish(&first);
        assert!(slot.is_busy());

        second.progress.push("working");
        assert_eq!(slot.progress(), vec!["working"]);

        slot.finish(&second);
        assert!(!slot.is_busy());
        assert_eq!(slot.progress(), vec!["working"]);

        slot.begin();
        assert!(slot.progress().is_empty());
    }
}
