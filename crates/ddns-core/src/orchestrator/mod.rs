//! Two-phase request orchestrator
//!
//! The RequestOrchestrator runs one update attempt for one record:
//! - Resolve the provider's record identifier on the worker pool, under a deadline
//! - Encode and POST the update, directly or through the proxy list
//! - Map the remote status code to a terminal `Status`
//!
//! ## State Machine
//!
//! ```text
//!   Init ──► ResolvingId ──┬──► Updating ──┬──► Done
//!                          │               │
//!                          ├──► Failed ◄───┘
//!                          │      │
//!                          └──► Timeout ──► Done
//! ```
//!
//! ## Ordering
//!
//! The update POST is only built after the resolution task reported
//! `Success` and its identifier was written into `Parameters`; the codec
//! refuses to encode an update without it.
//!
//! ## Deadline
//!
//! The caller waits on a [`TimeoutGate`]. When the deadline passes the
//! attempt ends as `Timeout`; the resolution task keeps running and its
//! result is discarded. The same policy applies in direct and proxied mode.

mod dispatch;
mod events;
mod resolve;

pub use dispatch::TransportMode;
pub use events::{AttemptEvent, Phase};

use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::gate::{GateOutcome, TimeoutGate};
use crate::params::{Parameters, RecordId};
use crate::pool::ClientPool;
use crate::proxy::ProxyList;
use crate::status::{State, Status};
use crate::traits::{Codec, CodeMapping, HttpClient, PostRequest, UpdateResponse};
use crate::worker::WorkerPool;
use events::EventSink;
use resolve::{ResolveJob, Resolved};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Final report of one attempt
///
/// `status` is always meaningful and should be reported; `error` is `None`
/// only when the update fully succeeded.
#[derive(Debug)]
pub struct Outcome {
    pub status: Status,
    pub error: Option<Error>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status.is_success()
    }

    /// Split into the status and a `Result` for `?`-style control flow
    pub fn into_parts(self) -> (Status, Result<()>) {
        let result = match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        };
        (self.status, result)
    }
}

/// Core update orchestrator
///
/// Holds only shared, injected resources: the codec, the client pool, the
/// worker pool and the transport mode. Each call to [`execute`](Self::execute)
/// is an independent attempt, so one orchestrator can serve many records
/// concurrently (wrap it in an `Arc`).
pub struct RequestOrchestrator<C: HttpClient + 'static> {
    codec: Arc<dyn Codec>,
    clients: Arc<ClientPool<C>>,
    workers: WorkerPool,
    gate: TimeoutGate,
    mode: TransportMode,
    events: EventSink,
}

impl<C: HttpClient + 'static> RequestOrchestrator<C> {
    /// Create a new orchestrator
    ///
    /// # Parameters
    ///
    /// - `codec`: Provider wire format
    /// - `clients`: Client pool shared with other orchestrators
    /// - `workers`: Pool running the resolution tasks
    /// - `config`: Orchestrator settings (deadline, proxy mode, event capacity)
    /// - `proxies`: Proxy list, used when `config.use_proxy` is set
    ///
    /// # Returns
    ///
    /// A tuple of (orchestrator, event_receiver) where event_receiver yields attempt events
    pub fn new(
        codec: Arc<dyn Codec>,
        clients: Arc<ClientPool<C>>,
        workers: WorkerPool,
        config: &OrchestratorConfig,
        proxies: ProxyList,
    ) -> Result<(Self, mpsc::Receiver<AttemptEvent>)> {
        config.validate()?;
        if config.use_proxy && proxies.is_empty() {
            return Err(Error::config(
                "Proxy mode is enabled but no proxies are configured",
            ));
        }

        let (events, rx) = EventSink::channel(config.event_channel_capacity);
        let mode = if config.use_proxy {
            TransportMode::Proxied(proxies)
        } else {
            TransportMode::Direct
        };

        let orchestrator = Self {
            codec,
            clients,
            workers,
            gate: TimeoutGate::new(config.resolve_timeout()),
            mode,
            events,
        };

        Ok((orchestrator, rx))
    }

    /// Override the resolution deadline
    pub fn with_resolve_timeout(mut self, deadline: Duration) -> Self {
        self.gate = TimeoutGate::new(deadline);
        self
    }

    pub fn mode(&self) -> &TransportMode {
        &self.mode
    }

    pub fn resolve_timeout(&self) -> Duration {
        self.gate.deadline()
    }

    /// Run one attempt for `params`
    ///
    /// Any identifier already present in `params` is discarded; on success
    /// `params.record_id` holds the identifier resolved by this attempt.
    pub async fn execute(&self, params: &mut Parameters) -> Outcome {
        let target = params.target();
        let mut status = Status::new(self.codec.name());

        self.enter(&target, Phase::Init);
        params.record_id = None;

        self.enter(&target, Phase::ResolvingId);
        let record_id = match self.resolve(params, &target, &mut status).await {
            Ok(id) => id,
            Err(e) => return self.finish(&target, status, Some(e)),
        };
        params.record_id = Some(record_id);
        debug!(record = %target, record_id = %record_id, "record id resolved");

        self.enter(&target, Phase::Updating);
        let error = self.update(params, &target, &mut status).await.err();
        if error.is_some() {
            self.enter(&target, Phase::Failed);
        }

        self.finish(&target, status, error)
    }

    async fn resolve(
        &self,
        params: &Parameters,
        target: &str,
        status: &mut Status,
    ) -> Result<RecordId> {
        let job = ResolveJob {
            codec: Arc::clone(&self.codec),
            clients: Arc::clone(&self.clients),
            mode: self.mode.clone(),
            params: params.clone(),
            events: self.events.clone(),
        };
        let completion = self.workers.submit(job.run());

        match self.gate.wait(completion).await {
            GateOutcome::Completed(Resolved {
                status: child,
                result,
            }) => {
                status.merge_messages(&child);
                match result {
                    Ok(id) if child.is_success() => Ok(id),
                    Ok(_) => Err(self.fail_resolution(
                        target,
                        status,
                        Error::Other(format!("resolution of {target} ended as {}", child.state)),
                    )),
                    Err(e) => Err(self.fail_resolution(target, status, e)),
                }
            }
            GateOutcome::Expired => {
                status.state = State::Timeout;
                status.add_error("resolution timeout");
                error!(
                    "Resolving record id of {} timed out after {:?}",
                    target,
                    self.gate.deadline()
                );
                self.enter(target, Phase::Timeout);
                Err(Error::timeout("resolution timeout"))
            }
            GateOutcome::Abandoned => Err(self.fail_resolution(
                target,
                status,
                Error::Other("resolution task ended without reporting".to_string()),
            )),
        }
    }

    fn fail_resolution(&self, target: &str, status: &mut Status, e: Error) -> Error {
        status.state = State::Failed;
        status.add_error(format!("resolve record id of {} failed: {}", target, e));
        error!("Failed to resolve record id of {}: {}", target, e);
        self.enter(target, Phase::Failed);
        e
    }

    async fn update(&self, params: &Parameters, target: &str, status: &mut Status) -> Result<()> {
        let body = self.codec.encode_update_request(params).inspect_err(|e| {
            status.state = State::Failed;
            status.add_error(format!("encode update request for {target}: {e}"));
        })?;
        debug!(record = %target, bytes = body.len(), "update request encoded");

        let sent = {
            let mut client = self.clients.acquire().inspect_err(|e| {
                status.state = State::Failed;
                status.add_error(format!("no client available: {e}"));
            })?;

            let request = PostRequest {
                url: self.codec.update_endpoint(),
                content_type: self.codec.content_type(),
                body: &body,
                proxy: None,
            };
            dispatch::send(&mut *client, &self.mode, request, target, status, &self.events).await
        };

        let (response, transport_error) = match sent {
            Ok(Some(bytes)) => match self.codec.decode_update_response(&bytes) {
                Ok(response) => (response, None),
                Err(e) => {
                    status.state = State::Failed;
                    status.add_error(format!(
                        "undecodable update response at {} {} {}: {}",
                        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
                        target,
                        params.value,
                        e
                    ));
                    return Err(e);
                }
            },
            Ok(None) => (UpdateResponse::default(), None),
            Err(e) => (UpdateResponse::default(), Some(e)),
        };

        let mapping = self.codec.status_codes().map(&response.code);
        status.state = mapping.state();

        let value = if response.record_value.is_empty() {
            &params.value
        } else {
            &response.record_value
        };
        let message = if response.message.is_empty() {
            "no response"
        } else {
            &response.message
        };
        let summary = format!("{} at {} {} {}", message, response.timestamp, target, value);

        if mapping == CodeMapping::Success {
            info!("{}", summary);
            status.add_info(summary);
            return Ok(());
        }

        let error = match transport_error {
            Some(e) => e,
            None => {
                let e = mapping.into_error(&response.code, &response.message);
                status.add_error(e.to_string());
                e
            }
        };
        error!("Failed to update {}: {}", target, error);
        status.add_error(summary);
        Err(error)
    }

    fn enter(&self, target: &str, phase: Phase) {
        debug!(record = %target, %phase, "attempt phase");
        self.events.emit(AttemptEvent::PhaseEntered {
            target: target.to_string(),
            phase,
        });
    }

    fn finish(&self, target: &str, status: Status, error: Option<Error>) -> Outcome {
        self.enter(target, Phase::Done);
        self.events.emit(AttemptEvent::Finished {
            target: target.to_string(),
            state: status.state,
        });
        Outcome { status, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_parts() {
        let mut status = Status::new("test");
        status.state = State::Success;
        let outcome = Outcome {
            status,
            error: None,
        };
        assert!(outcome.is_success());

        let (status, result) = outcome.into_parts();
        assert!(status.is_success());
        assert!(result.is_ok());
    }

    #[test]
    fn failed_outcome_keeps_status() {
        let mut status = Status::new("test");
        status.state = State::Timeout;
        status.add_error("resolution timeout");
        let outcome = Outcome {
            status,
            error: Some(Error::timeout("resolution timeout")),
        };
        assert!(!outcome.is_success());

        let (status, result) = outcome.into_parts();
        assert_eq!(status.state, State::Timeout);
        assert!(result.unwrap_err().is_timeout());
    }

    #[test]
    fn phase_display() {
        assert_eq!(Phase::ResolvingId.to_string(), "resolving-id");
        assert_eq!(Phase::Done.to_string(), "done");
    }
}
