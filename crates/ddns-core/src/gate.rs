//! Deadline race over a task's completion

use crate::worker::Completion;
use std::time::Duration;

/// Result of racing a completion against the deadline
#[derive(Debug, PartialEq, Eq)]
pub enum GateOutcome<T> {
    /// The task reported before the deadline
    Completed(T),
    /// The deadline passed first; any later result is discarded
    Expired,
    /// The task ended without reporting (it panicked or was never run)
    Abandoned,
}

/// Bounded wait on a [`Completion`]
///
/// The gate cancels only the caller's wait. A task still running when the
/// deadline passes keeps running; its result is dropped when it reports.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutGate {
    deadline: Duration,
}

impl TimeoutGate {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Wait for `completion` or the deadline, whichever comes first
    pub async fn wait<T>(&self, completion: Completion<T>) -> GateOutcome<T> {
        match tokio::time::timeout(self.deadline, completion.rx).await {
            Ok(Ok(value)) => GateOutcome::Completed(value),
            Ok(Err(_)) => GateOutcome::Abandoned,
            Err(_) => GateOutcome::Expired,
        }
    }
}
