//! Parameters of one DNS record update

use crate::config::{RecordConfig, RecordType};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// Provider record identifier produced by the resolution phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(NonZeroU32);

impl RecordId {
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw: u32 = s
            .trim()
            .parse()
            .map_err(|e| Error::decode(format!("invalid record id {s:?}: {e}")))?;
        Self::new(raw).ok_or_else(|| Error::decode("record id must be non-zero"))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifying and mutable fields of one record update
///
/// `record_id` starts as `None` and is filled in by the orchestrator once the
/// resolution phase succeeds. Codecs refuse to encode an update without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    pub domain: String,
    pub subdomain: String,
    pub record_type: RecordType,
    pub line: String,
    pub ttl: u32,
    pub value: String,
    #[serde(default)]
    pub record_id: Option<RecordId>,
}

impl Parameters {
    pub fn new(
        domain: impl Into<String>,
        subdomain: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            subdomain: subdomain.into(),
            record_type: RecordType::Auto,
            line: crate::config::DEFAULT_RECORD_LINE.to_string(),
            ttl: crate::config::DEFAULT_TTL,
            value: value.into(),
            record_id: None,
        }
    }

    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line = line.into();
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// `subdomain.domain`, used when composing messages
    pub fn target(&self) -> String {
        format!("{}.{}", self.subdomain, self.domain)
    }

    /// Concrete record type, resolving `Auto` from the target value
    pub fn effective_record_type(&self) -> RecordType {
        self.record_type.resolve_for(&self.value)
    }

    /// The resolved identifier, or an error if resolution has not run
    pub fn require_record_id(&self) -> Result<RecordId> {
        self.record_id.ok_or_else(|| {
            Error::invalid_input(format!("record id of {} is not resolved", self.target()))
        })
    }
}

impl From<&RecordConfig> for Parameters {
    fn from(record: &RecordConfig) -> Self {
        Parameters::new(&record.domain, &record.subdomain, &record.value)
            .with_record_type(record.record_type)
            .with_line(&record.line)
            .with_ttl(record.ttl)
    }
}
