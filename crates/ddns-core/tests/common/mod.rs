//! Test doubles and common utilities for orchestrator contract tests
//!
//! This module provides a scripted HTTP client and a minimal JSON codec so
//! the contracts can be checked without any network access.

#![allow(dead_code)]

use ddns_core::config::OrchestratorConfig;
use ddns_core::error::{Error, Result};
use ddns_core::orchestrator::{AttemptEvent, Phase};
use ddns_core::params::Parameters;
use ddns_core::pool::ClientPool;
use ddns_core::proxy::ProxyList;
use ddns_core::traits::{
    Codec, HttpClient, PostRequest, ResolveResponse, StatusCodeTable, UpdateResponse,
};
use ddns_core::worker::WorkerPool;
use ddns_core::RequestOrchestrator;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const RESOLVE_URL: &str = "http://provider.test/resolve";
pub const UPDATE_URL: &str = "http://provider.test/update";

/// One POST seen by a scripted client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub url: String,
    pub proxy: Option<String>,
    pub body: String,
}

impl Call {
    pub fn is_resolve(&self) -> bool {
        self.url == RESOLVE_URL
    }

    pub fn is_update(&self) -> bool {
        self.url == UPDATE_URL
    }
}

/// What a scripted client answers
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with this body
    Body(String),
    /// Fail at the transport layer
    Fail,
    /// Respond with this body after a delay
    Delayed(Duration, String),
}

type Responder = dyn Fn(&Call) -> Reply + Send + Sync;

/// Shared script and call log of every client built by one pool
pub struct Script {
    responder: Box<Responder>,
    calls: Mutex<Vec<Call>>,
}

impl Script {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&Call) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every POST so far, in send order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn resolve_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_resolve).collect()
    }

    pub fn update_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_update).collect()
    }
}

/// HttpClient double answering from a shared [`Script`]
pub struct ScriptedClient {
    script: Arc<Script>,
}

#[async_trait::async_trait]
impl HttpClient for ScriptedClient {
    async fn post(&mut self, request: PostRequest<'_>) -> Result<Vec<u8>> {
        let call = Call {
            url: request.url.to_string(),
            proxy: request.proxy.map(|p| p.to_string()),
            body: String::from_utf8_lossy(request.body).into_owned(),
        };
        self.script.calls.lock().unwrap().push(call.clone());

        match (self.script.responder)(&call) {
            Reply::Body(body) => Ok(body.into_bytes()),
            Reply::Fail => Err(Error::transport(format!("connection refused: {}", call.url))),
            Reply::Delayed(delay, body) => {
                tokio::time::sleep(delay).await;
                Ok(body.into_bytes())
            }
        }
    }
}

#[derive(Serialize)]
struct LookupBody<'a> {
    domain: &'a str,
    sub_domain: &'a str,
}

#[derive(Serialize)]
struct ChangeBody<'a> {
    record_id: u32,
    value: &'a str,
}

#[derive(Deserialize)]
struct Answer {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    at: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    value: String,
}

/// Minimal JSON codec: success code is "1", "-1" is a known failure
pub struct JsonCodec {
    table: StatusCodeTable,
    update_encodes: Arc<AtomicUsize>,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self {
            table: StatusCodeTable::new()
                .success("1")
                .failure("-1", "authentication failed"),
            update_encodes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of successful update encodings
    pub fn update_encodes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.update_encodes)
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &str {
        "json-test"
    }

    fn resolve_endpoint(&self) -> &str {
        RESOLVE_URL
    }

    fn update_endpoint(&self) -> &str {
        UPDATE_URL
    }

    fn content_type(&self) -> &str {
        "application/json"
    }

    fn encode_resolve_request(&self, params: &Parameters) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&LookupBody {
            domain: &params.domain,
            sub_domain: &params.subdomain,
        })
        .map_err(|e| Error::Other(e.to_string()))?)
    }

    fn encode_update_request(&self, params: &Parameters) -> Result<Vec<u8>> {
        let record_id = params.require_record_id()?;
        self.update_encodes.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::to_vec(&ChangeBody {
            record_id: record_id.get(),
            value: &params.value,
        })
        .map_err(|e| Error::Other(e.to_string()))?)
    }

    fn decode_resolve_response(&self, body: &[u8]) -> Result<ResolveResponse> {
        let answer: Answer =
            serde_json::from_slice(body).map_err(|e| Error::decode(e.to_string()))?;
        Ok(ResolveResponse {
            code: answer.code,
            message: answer.message,
            timestamp: answer.at,
            record_id: answer.id,
        })
    }

    fn decode_update_response(&self, body: &[u8]) -> Result<UpdateResponse> {
        let answer: Answer =
            serde_json::from_slice(body).map_err(|e| Error::decode(e.to_string()))?;
        Ok(UpdateResponse {
            code: answer.code,
            message: answer.message,
            timestamp: answer.at,
            record_value: answer.value,
        })
    }

    fn status_codes(&self) -> &StatusCodeTable {
        &self.table
    }
}

/// Successful lookup answer carrying `id`
pub fn found(id: u32) -> Reply {
    Reply::Body(format!(
        r#"{{"code":"1","message":"Action completed successful","at":"2024-05-01 10:00:00","id":"{id}"}}"#
    ))
}

/// Successful lookup answer without any record
pub fn nothing_found() -> Reply {
    Reply::Body(
        r#"{"code":"1","message":"Action completed successful","at":"2024-05-01 10:00:00"}"#
            .to_string(),
    )
}

/// Successful update answer
pub fn updated(value: &str) -> Reply {
    Reply::Body(format!(
        r#"{{"code":"1","message":"Action completed successful","at":"2024-05-01 10:00:01","value":"{value}"}}"#
    ))
}

/// Answer carrying a non-success status code
pub fn rejected(code: &str) -> Reply {
    Reply::Body(format!(
        r#"{{"code":"{code}","message":"Login fail","at":"2024-05-01 10:00:01"}}"#
    ))
}

/// Record under test
pub fn params() -> Parameters {
    Parameters::new("example.com", "www", "203.0.113.7")
}

pub fn proxies(urls: &[&str]) -> ProxyList {
    ProxyList::parse(urls).unwrap()
}

/// Everything a contract test needs to drive and observe one orchestrator
pub struct Harness {
    pub orchestrator: RequestOrchestrator<ScriptedClient>,
    pub events: mpsc::Receiver<AttemptEvent>,
    pub clients: Arc<ClientPool<ScriptedClient>>,
    pub script: Arc<Script>,
    pub update_encodes: Arc<AtomicUsize>,
}

impl Harness {
    /// Direct-mode harness
    pub fn direct(script: Arc<Script>) -> Self {
        Self::build(script, OrchestratorConfig::default(), ProxyList::default())
    }

    /// Proxied-mode harness
    pub fn proxied(script: Arc<Script>, proxies: ProxyList) -> Self {
        let config = OrchestratorConfig {
            use_proxy: true,
            ..OrchestratorConfig::default()
        };
        Self::build(script, config, proxies)
    }

    pub fn build(script: Arc<Script>, config: OrchestratorConfig, proxies: ProxyList) -> Self {
        let codec = JsonCodec::new();
        let update_encodes = codec.update_encodes();

        let factory_script = Arc::clone(&script);
        let clients = Arc::new(ClientPool::new(config.max_idle_clients, move || {
            Ok(ScriptedClient {
                script: Arc::clone(&factory_script),
            })
        }));

        let (orchestrator, events) = RequestOrchestrator::new(
            Arc::new(codec),
            Arc::clone(&clients),
            WorkerPool::new(config.worker_pool_size),
            &config,
            proxies,
        )
        .expect("orchestrator construction succeeds");

        Self {
            orchestrator,
            events,
            clients,
            script,
            update_encodes,
        }
    }

    /// Shorten the resolution deadline
    pub fn with_resolve_timeout(mut self, deadline: Duration) -> Self {
        self.orchestrator = self.orchestrator.with_resolve_timeout(deadline);
        self
    }

    /// Drain every event emitted so far
    pub fn drain_events(&mut self) -> Vec<AttemptEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Phases entered so far, in order
    pub fn phases(&mut self) -> Vec<Phase> {
        self.drain_events()
            .into_iter()
            .filter_map(|event| match event {
                AttemptEvent::PhaseEntered { phase, .. } => Some(phase),
                _ => None,
            })
            .collect()
    }
}

/// Wait until every checked-out client is back, or panic after `limit`
pub async fn wait_for_returned_clients(clients: &ClientPool<ScriptedClient>, limit: Duration) {
    let started = tokio::time::Instant::now();
    while clients.outstanding() > 0 {
        assert!(
            started.elapsed() < limit,
            "{} clients still checked out after {:?}",
            clients.outstanding(),
            limit
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
