// # ddns-core
//
// Core library of the two-phase DDNS updater.
//
// ## Architecture Overview
//
// Updating a record is two dependent HTTP POSTs against a provider API:
// first resolve the record's identifier, then update the record by that
// identifier. This crate owns the machinery around those POSTs:
//
// - **Codec**: Trait for the provider-specific wire format
// - **HttpClient**: Trait for the outbound POST, with optional proxy
// - **ClientPool**: Checkout/return pool of reusable clients
// - **WorkerPool** / **TimeoutGate**: Bounded task execution with a deadline
// - **ProxyList**: Ordered proxies tried once each, in order
// - **RequestOrchestrator**: The resolve → update state machine
// - **CodecRegistry**: Plugin-based registry for provider codecs
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Orchestration knows nothing about any provider
// 2. **Injected Resources**: Pools and codecs are passed in, never global
// 3. **Plugin-Based**: Codecs are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Accumulated Diagnostics**: Every attempt reports a `Status`, even on failure

pub mod config;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod params;
pub mod pool;
pub mod proxy;
pub mod registry;
pub mod status;
pub mod traits;
pub mod transport;
pub mod worker;

// Re-export core types for convenience
pub use config::{DdnsConfig, OrchestratorConfig, ProviderConfig, RecordConfig, RecordType};
pub use error::{Error, Result};
pub use gate::{GateOutcome, TimeoutGate};
pub use orchestrator::{AttemptEvent, Outcome, Phase, RequestOrchestrator, TransportMode};
pub use params::{Parameters, RecordId};
pub use pool::{ClientPool, PooledClient};
pub use proxy::{ProxyIter, ProxyList, ProxyRef};
pub use registry::CodecRegistry;
pub use status::{Level, Message, MessageGroup, State, Status};
pub use traits::{Codec, CodecFactory, HttpClient, PostRequest};
pub use transport::ReqwestClient;
pub use worker::{Completion, WorkerPool};
