//! Resolution phase: look up the provider's record identifier
//!
//! Runs as a worker-pool task with its own `Status`. The orchestrator merges
//! that status into the attempt's report whatever the outcome.

use super::dispatch::{self, TransportMode};
use super::events::EventSink;
use crate::error::{Error, Result};
use crate::params::{Parameters, RecordId};
use crate::pool::ClientPool;
use crate::status::{State, Status};
use crate::traits::{Codec, CodeMapping, HttpClient, PostRequest, ResolveResponse};
use std::sync::Arc;
use tracing::debug;

/// Everything the resolution task owns
pub(crate) struct ResolveJob<C: HttpClient + 'static> {
    pub(crate) codec: Arc<dyn Codec>,
    pub(crate) clients: Arc<ClientPool<C>>,
    pub(crate) mode: TransportMode,
    pub(crate) params: Parameters,
    pub(crate) events: EventSink,
}

/// Report of a finished resolution task
#[derive(Debug)]
pub(crate) struct Resolved {
    pub(crate) status: Status,
    pub(crate) result: Result<RecordId>,
}

impl<C: HttpClient + 'static> ResolveJob<C> {
    pub(crate) async fn run(self) -> Resolved {
        let mut status = Status::new(self.codec.name());
        let result = self.resolve(&mut status).await;

        status.state = match &result {
            Ok(_) => State::Success,
            Err(_) => State::Failed,
        };
        Resolved { status, result }
    }

    async fn resolve(&self, status: &mut Status) -> Result<RecordId> {
        let target = self.params.target();

        let body = self
            .codec
            .encode_resolve_request(&self.params)
            .inspect_err(|e| status.add_error(format!("encode resolve request for {target}: {e}")))?;
        debug!(record = %target, bytes = body.len(), "resolve request encoded");

        let sent = {
            let mut client = self
                .clients
                .acquire()
                .inspect_err(|e| status.add_error(format!("no client available: {e}")))?;

            let request = PostRequest {
                url: self.codec.resolve_endpoint(),
                content_type: self.codec.content_type(),
                body: &body,
                proxy: None,
            };
            dispatch::send(&mut *client, &self.mode, request, &target, status, &self.events).await?
        };

        let response = match sent {
            Some(bytes) => self.codec.decode_resolve_response(&bytes).inspect_err(|e| {
                status.add_error(format!("undecodable resolve response for {target}: {e}"))
            })?,
            None => ResolveResponse::default(),
        };
        debug!(record = %target, code = %response.code, "resolve response decoded");

        let summary = format!("{} at {} {}", response.message, response.timestamp, target);
        match self.codec.status_codes().map(&response.code) {
            CodeMapping::Success => {}
            CodeMapping::Empty => {
                status.add_error(format!("empty status code in resolve response for {target}"));
                return Err(Error::EmptyStatusCode);
            }
            failed => {
                status.add_error(summary);
                return Err(failed.into_error(&response.code, &response.message));
            }
        }

        let Some(raw_id) = response.record_id.as_deref() else {
            status.add_error(summary);
            return Err(Error::empty_result(target));
        };

        let id = raw_id.parse::<RecordId>().inspect_err(|_| {
            status.add_error(format!("{summary} (record id {raw_id:?})"));
        })?;

        status.add_info(summary);
        Ok(id)
    }
}
