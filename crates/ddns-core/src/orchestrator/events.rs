//! Attempt events and the bounded sink that carries them

use crate::status::State;
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

/// States of one orchestrated attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    ResolvingId,
    Updating,
    Failed,
    Timeout,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Init => "init",
            Phase::ResolvingId => "resolving-id",
            Phase::Updating => "updating",
            Phase::Failed => "failed",
            Phase::Timeout => "timeout",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Events emitted by the RequestOrchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptEvent {
    /// The attempt for `target` entered `phase`
    PhaseEntered { target: String, phase: Phase },

    /// One POST was sent (directly when `proxy` is `None`)
    PostAttempted {
        target: String,
        url: String,
        proxy: Option<String>,
        succeeded: bool,
    },

    /// The attempt finished with `state`
    Finished { target: String, state: State },
}

/// Cloneable sender half; never blocks the attempt
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::Sender<AttemptEvent>,
}

impl EventSink {
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<AttemptEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Send an event, dropping it if the channel is full
    pub(crate) fn emit(&self, event: AttemptEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
