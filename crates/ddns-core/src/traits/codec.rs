// # Codec Trait
//
// Defines the provider-specific wire format used by the orchestrator.
//
// ## Implementations
//
// - DNSPod: `ddns-provider-dnspod` crate
//
// ## Contract
//
// A codec is pure: it turns `Parameters` into request bodies and response
// bodies into the two closed response shapes below. It performs no I/O and
// keeps no state between calls. The orchestrator never branches on which
// provider it talks to; everything provider-specific sits behind this trait.
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::traits::Codec;
//
// let body = codec.encode_resolve_request(&params)?;
// let bytes = client.post(PostRequest { url: codec.resolve_endpoint(), .. }).await?;
// let response = codec.decode_resolve_response(&bytes)?;
//
// match codec.status_codes().map(&response.code) {
//     CodeMapping::Success => { /* use response.record_id */ }
//     other => return Err(other.into_error(&response.code, &response.message)),
// }
// ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::params::Parameters;
use crate::status::State;
use std::collections::HashMap;
use std::sync::Arc;

/// Content type of form-encoded request bodies
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Decoded answer to a resolve (record lookup) request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveResponse {
    /// Remote status code
    pub code: String,
    /// Remote message
    pub message: String,
    /// Remote timestamp, verbatim
    pub timestamp: String,
    /// Identifier of the first matching record, if any matched
    pub record_id: Option<String>,
}

/// Decoded answer to an update request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResponse {
    /// Remote status code
    pub code: String,
    /// Remote message
    pub message: String,
    /// Remote timestamp, verbatim
    pub timestamp: String,
    /// Value the record holds after the update
    pub record_value: String,
}

/// Provider wire format
pub trait Codec: Send + Sync {
    /// Provider name, used as the `Status` name
    fn name(&self) -> &str;

    /// Endpoint that resolves a record identifier
    fn resolve_endpoint(&self) -> &str;

    /// Endpoint that updates a record
    fn update_endpoint(&self) -> &str;

    /// Content type of the encoded request bodies
    fn content_type(&self) -> &str {
        FORM_URLENCODED
    }

    /// Encode the lookup request (no record id needed)
    fn encode_resolve_request(&self, params: &Parameters) -> Result<Vec<u8>>;

    /// Encode the update request
    ///
    /// Must fail if `params.record_id` is unset.
    fn encode_update_request(&self, params: &Parameters) -> Result<Vec<u8>>;

    fn decode_resolve_response(&self, body: &[u8]) -> Result<ResolveResponse>;

    fn decode_update_response(&self, body: &[u8]) -> Result<UpdateResponse>;

    /// Table mapping remote status codes to outcomes
    fn status_codes(&self) -> &StatusCodeTable;
}

/// Classification of a remote status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeMapping<'a> {
    /// The success code
    Success,
    /// A non-success code, with the table's description when it is known
    Failed { description: Option<&'a str> },
    /// No code at all
    Empty,
}

impl CodeMapping<'_> {
    /// Terminal `State` for this mapping
    pub fn state(&self) -> State {
        match self {
            CodeMapping::Success => State::Success,
            CodeMapping::Failed { .. } | CodeMapping::Empty => State::Failed,
        }
    }

    /// Error describing a non-success mapping
    ///
    /// `Success` has no error; calling this on it yields `Error::Other`.
    pub fn into_error(self, code: &str, remote_message: &str) -> Error {
        match self {
            CodeMapping::Empty => Error::EmptyStatusCode,
            CodeMapping::Failed { description } => {
                let message = match description {
                    Some(d) if remote_message.is_empty() => d.to_string(),
                    Some(d) => format!("{remote_message}: {d}"),
                    None => remote_message.to_string(),
                };
                Error::protocol(code, message)
            }
            CodeMapping::Success => Error::Other(format!("status code {code} is a success")),
        }
    }
}

#[derive(Debug, Clone)]
struct CodeEntry {
    state: State,
    description: Option<String>,
}

/// Table-driven status-code mapping
///
/// Codes registered as success map to [`CodeMapping::Success`]; every other
/// non-empty code is a failure (described when registered). An empty or
/// whitespace-only code is [`CodeMapping::Empty`].
#[derive(Debug, Clone, Default)]
pub struct StatusCodeTable {
    entries: HashMap<String, CodeEntry>,
}

impl StatusCodeTable {
    /// An empty table: every non-empty code is a failure
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a success code
    pub fn success(mut self, code: impl Into<String>) -> Self {
        self.entries.insert(
            code.into(),
            CodeEntry {
                state: State::Success,
                description: None,
            },
        );
        self
    }

    /// Register a known failure code with a description
    pub fn failure(mut self, code: impl Into<String>, description: impl Into<String>) -> Self {
        self.entries.insert(
            code.into(),
            CodeEntry {
                state: State::Failed,
                description: Some(description.into()),
            },
        );
        self
    }

    /// Classify `code`
    pub fn map(&self, code: &str) -> CodeMapping<'_> {
        let code = code.trim();
        if code.is_empty() {
            return CodeMapping::Empty;
        }
        match self.entries.get(code) {
            Some(entry) if entry.state == State::Success => CodeMapping::Success,
            Some(entry) => CodeMapping::Failed {
                description: entry.description.as_deref(),
            },
            None => CodeMapping::Failed { description: None },
        }
    }
}

/// Helper trait for constructing codecs from configuration
pub trait CodecFactory: Send + Sync {
    /// Create a Codec instance from configuration
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn Codec>>;
}
