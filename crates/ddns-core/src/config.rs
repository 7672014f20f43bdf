//! Configuration types for the DDNS system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Record line used when none is configured (DNSPod's default line)
pub const DEFAULT_RECORD_LINE: &str = "默认";

/// TTL used when none is configured
pub const DEFAULT_TTL: u32 = 600;

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// DNS records to update
    pub records: Vec<RecordConfig>,

    /// Proxies tried in order when `orchestrator.use_proxy` is set
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Optional orchestrator settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl DdnsConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            provider: ProviderConfig::default(),
            records: Vec::new(),
            proxies: Vec::new(),
            orchestrator: OrchestratorConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.records.is_empty() {
            return Err(crate::Error::config("No records configured"));
        }

        self.provider.validate()?;
        for record in &self.records {
            record.validate()?;
        }

        for proxy in &self.proxies {
            crate::proxy::ProxyRef::parse(proxy)?;
        }

        if self.orchestrator.use_proxy && self.proxies.is_empty() {
            return Err(crate::Error::config(
                "Proxy mode is enabled but no proxies are configured",
            ));
        }

        self.orchestrator.validate()
    }
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// DNSPod provider
    Dnspod {
        /// DNSPod login token (`id,token`)
        login_token: String,
        /// Response format requested from the API
        #[serde(default = "default_format")]
        format: String,
        /// Language of remote messages
        #[serde(default = "default_lang")]
        lang: String,
        /// Whether an empty record list is reported as an API error
        #[serde(default = "default_error_on_empty")]
        error_on_empty: String,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// DNSPod configuration with default format/lang settings
    pub fn dnspod(login_token: impl Into<String>) -> Self {
        ProviderConfig::Dnspod {
            login_token: login_token.into(),
            format: default_format(),
            lang: default_lang(),
            error_on_empty: default_error_on_empty(),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Dnspod { login_token, format, .. } => {
                if login_token.is_empty() {
                    return Err(crate::Error::config("DNSPod login token cannot be empty"));
                }
                if format != "json" {
                    return Err(crate::Error::config(format!(
                        "DNSPod response format must be json, got {format:?}"
                    )));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Dnspod { .. } => "dnspod",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::dnspod(String::new())
    }
}

fn default_format() -> String {
    "json".to_string()
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_error_on_empty() -> String {
    "no".to_string()
}

/// DNS record configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Registered domain (e.g., "example.com")
    pub domain: String,

    /// Host part (e.g., "www", or "@" for the apex)
    pub subdomain: String,

    /// Record type (A, AAAA, CNAME, TXT, or auto-detect from the value)
    #[serde(default = "default_record_type")]
    pub record_type: RecordType,

    /// Provider line / view
    #[serde(default = "default_line")]
    pub line: String,

    /// Time-to-live in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Value to write
    pub value: String,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(
        domain: impl Into<String>,
        subdomain: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            subdomain: subdomain.into(),
            record_type: RecordType::Auto,
            line: default_line(),
            ttl: default_ttl(),
            value: value.into(),
        }
    }

    /// Set the record type
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Validate the record configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.is_empty() {
            return Err(crate::Error::config("Record domain cannot be empty"));
        }
        if self.subdomain.is_empty() {
            return Err(crate::Error::config(format!(
                "Record subdomain for {} cannot be empty (use \"@\" for the apex)",
                self.domain
            )));
        }
        if self.value.is_empty() {
            return Err(crate::Error::config(format!(
                "Record value for {}.{} cannot be empty",
                self.subdomain, self.domain
            )));
        }
        match self.record_type.resolve_for(&self.value) {
            RecordType::A if !self.value.parse::<IpAddr>().is_ok_and(|ip| ip.is_ipv4()) => {
                Err(crate::Error::config(format!(
                    "A record value must be an IPv4 address, got {}",
                    self.value
                )))
            }
            RecordType::Aaaa if !self.value.parse::<IpAddr>().is_ok_and(|ip| ip.is_ipv6()) => {
                Err(crate::Error::config(format!(
                    "AAAA record value must be an IPv6 address, got {}",
                    self.value
                )))
            }
            _ => Ok(()),
        }
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
    /// CNAME record
    Cname,
    /// TXT record
    Txt,
    /// Auto-detect based on the value (AAAA for IPv6, A otherwise)
    Auto,
}

impl RecordType {
    /// Replace `Auto` with the concrete type implied by `value`
    pub fn resolve_for(self, value: &str) -> RecordType {
        match self {
            RecordType::Auto => match value.parse::<IpAddr>() {
                Ok(IpAddr::V6(_)) => RecordType::Aaaa,
                _ => RecordType::A,
            },
            other => other,
        }
    }

    /// Wire name of the record type
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A | RecordType::Auto => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
        }
    }
}

impl std::str::FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" => Ok(RecordType::A),
            "aaaa" => Ok(RecordType::Aaaa),
            "cname" => Ok(RecordType::Cname),
            "txt" => Ok(RecordType::Txt),
            "auto" | "" => Ok(RecordType::Auto),
            other => Err(crate::Error::config(format!("Unsupported record type: {other}"))),
        }
    }
}

fn default_record_type() -> RecordType {
    RecordType::Auto
}

fn default_line() -> String {
    DEFAULT_RECORD_LINE.to_string()
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Deadline for the resolution phase (in seconds)
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,

    /// Per-request HTTP timeout for pooled clients (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Maximum number of resolution tasks running at once
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Idle clients kept by the client pool; extra clients are dropped on return
    #[serde(default = "default_max_idle_clients")]
    pub max_idle_clients: usize,

    /// Route POSTs through the configured proxy list
    #[serde(default)]
    pub use_proxy: bool,

    /// Capacity of the attempt event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl OrchestratorConfig {
    /// Resolution deadline as a `Duration`
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// HTTP timeout as a `Duration`
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Validate the orchestrator configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.resolve_timeout_secs == 0 {
            return Err(crate::Error::config("Resolve timeout must be > 0"));
        }
        if self.http_timeout_secs == 0 {
            return Err(crate::Error::config("HTTP timeout must be > 0"));
        }
        if self.worker_pool_size == 0 {
            return Err(crate::Error::config("Worker pool size must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: default_resolve_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            worker_pool_size: default_worker_pool_size(),
            max_idle_clients: default_max_idle_clients(),
            use_proxy: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_resolve_timeout_secs() -> u64 {
    20
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_worker_pool_size() -> usize {
    4
}

fn default_max_idle_clients() -> usize {
    8
}

fn default_event_channel_capacity() -> usize {
    100
}
