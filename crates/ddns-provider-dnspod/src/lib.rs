// # DNSPod Codec
//
// This crate provides the DNSPod wire format for the DDNS update orchestrator.
//
// ## API Reference
//
// - Record lookup: POST `https://dnsapi.cn/Record.List`
// - Dynamic update: POST `https://dnsapi.cn/Record.Ddns`
//
// Both endpoints take `application/x-www-form-urlencoded` bodies and answer
// with JSON carrying a `status` object (`code`, `message`, `created_at`).
// Code `"1"` is success; every other code is a failure.
//
// ## Security Requirements
//
// - The login token NEVER appears in logs or Debug output
// - The codec fails fast if the token is empty
//
// ## Usage
//
// ```rust,ignore
// let registry = CodecRegistry::new();
// ddns_provider_dnspod::register(&registry);
// let codec = registry.create_codec(&ProviderConfig::dnspod("12345,abcdef"))?;
// ```

use ddns_core::config::ProviderConfig;
use ddns_core::params::Parameters;
use ddns_core::registry::CodecRegistry;
use ddns_core::traits::{
    Codec, CodecFactory, ResolveResponse, StatusCodeTable, UpdateResponse,
};
use ddns_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Provider name, also the registry key
pub const PROVIDER_NAME: &str = "dnspod";

/// Record lookup endpoint
pub const RECORD_LIST_URL: &str = "https://dnsapi.cn/Record.List";

/// Dynamic record update endpoint
pub const RECORD_DDNS_URL: &str = "https://dnsapi.cn/Record.Ddns";

/// DNSPod wire format
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the login token.
pub struct DnspodCodec {
    /// `id,token` pair
    /// ⚠️ NEVER log this value
    login_token: String,
    format: String,
    lang: String,
    error_on_empty: String,
    table: StatusCodeTable,
}

// Custom Debug implementation that hides the login token
impl std::fmt::Debug for DnspodCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnspodCodec")
            .field("login_token", &"<REDACTED>")
            .field("format", &self.format)
            .field("lang", &self.lang)
            .field("error_on_empty", &self.error_on_empty)
            .finish()
    }
}

impl DnspodCodec {
    /// Create a codec with the default `json` / `en` / `no` settings
    pub fn new(login_token: impl Into<String>) -> Result<Self> {
        Self::with_options(login_token, "json", "en", "no")
    }

    /// Create a codec with explicit request options
    ///
    /// # Parameters
    ///
    /// - `login_token`: DNSPod API token in `id,token` form
    /// - `format`: Response format, must be `json`
    /// - `lang`: Language of remote messages (`en` or `cn`)
    /// - `error_on_empty`: Whether an empty record list is an API error (`yes`/`no`)
    pub fn with_options(
        login_token: impl Into<String>,
        format: impl Into<String>,
        lang: impl Into<String>,
        error_on_empty: impl Into<String>,
    ) -> Result<Self> {
        let login_token = login_token.into();
        if login_token.trim().is_empty() {
            return Err(Error::config("DNSPod login token is required"));
        }

        let format = format.into();
        if format != "json" {
            return Err(Error::config(format!(
                "DNSPod codec only decodes json responses, got format {format:?}"
            )));
        }

        Ok(Self {
            login_token,
            format,
            lang: lang.into(),
            error_on_empty: error_on_empty.into(),
            table: status_codes(),
        })
    }

    fn common<'a>(&'a self, params: &'a Parameters) -> CommonFields<'a> {
        CommonFields {
            login_token: &self.login_token,
            format: &self.format,
            lang: &self.lang,
            error_on_empty: &self.error_on_empty,
            domain: &params.domain,
            sub_domain: &params.subdomain,
            record_line: &params.line,
            record_type: params.effective_record_type().as_str(),
        }
    }
}

/// Known DNSPod status codes
///
/// Codes outside the table still map to failure; the table only adds a
/// description to the reported error.
fn status_codes() -> StatusCodeTable {
    StatusCodeTable::new()
        .success("1")
        .failure("-1", "login failed")
        .failure("-2", "API usage limit exceeded")
        .failure("-3", "not a valid agent")
        .failure("-4", "not an agent of this user")
        .failure("-7", "no permission")
        .failure("-8", "too many failed logins, account locked")
        .failure("-99", "API temporarily unavailable")
        .failure("2", "only POST requests are allowed")
        .failure("3", "unknown error")
        .failure("6", "invalid domain id")
        .failure("7", "domain is not owned by this account")
        .failure("8", "invalid record id")
        .failure("10", "no records found")
        .failure("21", "domain is locked")
        .failure("22", "invalid subdomain")
        .failure("23", "subdomain level exceeds limit")
        .failure("26", "invalid record line")
        .failure("27", "invalid record type")
        .failure("29", "TTL below the plan minimum")
        .failure("85", "login from an unusual IP address")
}

/// Form fields shared by both requests, in the order DNSPod documents them
#[derive(Serialize)]
struct CommonFields<'a> {
    login_token: &'a str,
    format: &'a str,
    lang: &'a str,
    error_on_empty: &'a str,
    domain: &'a str,
    sub_domain: &'a str,
    record_line: &'a str,
    record_type: &'a str,
}

#[derive(Serialize)]
struct DdnsFields<'a> {
    login_token: &'a str,
    format: &'a str,
    lang: &'a str,
    error_on_empty: &'a str,
    domain: &'a str,
    sub_domain: &'a str,
    record_line: &'a str,
    record_type: &'a str,
    ttl: u32,
    value: &'a str,
    record_id: u32,
}

#[derive(Debug, Default, Deserialize)]
struct RemoteStatus {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct RecordListReply {
    #[serde(default)]
    status: RemoteStatus,
    #[serde(default)]
    records: Vec<ListedRecord>,
}

#[derive(Debug, Deserialize)]
struct ListedRecord {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RecordDdnsReply {
    #[serde(default)]
    status: RemoteStatus,
    #[serde(default)]
    record: Option<UpdatedRecord>,
}

#[derive(Debug, Deserialize)]
struct UpdatedRecord {
    #[serde(default)]
    value: String,
}

fn encode_form<T: Serialize>(fields: &T) -> Result<Vec<u8>> {
    serde_urlencoded::to_string(fields)
        .map(String::into_bytes)
        .map_err(|e| Error::provider(PROVIDER_NAME, format!("form encoding failed: {e}")))
}

fn decode_json<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        Error::decode(format!(
            "invalid DNSPod response ({} bytes): {}",
            body.len(),
            e
        ))
    })
}

impl Codec for DnspodCodec {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn resolve_endpoint(&self) -> &str {
        RECORD_LIST_URL
    }

    fn update_endpoint(&self) -> &str {
        RECORD_DDNS_URL
    }

    fn encode_resolve_request(&self, params: &Parameters) -> Result<Vec<u8>> {
        encode_form(&self.common(params))
    }

    fn encode_update_request(&self, params: &Parameters) -> Result<Vec<u8>> {
        let record_id = params.require_record_id()?;
        let common = self.common(params);
        encode_form(&DdnsFields {
            login_token: common.login_token,
            format: common.format,
            lang: common.lang,
            error_on_empty: common.error_on_empty,
            domain: common.domain,
            sub_domain: common.sub_domain,
            record_line: common.record_line,
            record_type: common.record_type,
            ttl: params.ttl,
            value: &params.value,
            record_id: record_id.get(),
        })
    }

    fn decode_resolve_response(&self, body: &[u8]) -> Result<ResolveResponse> {
        let reply: RecordListReply = decode_json(body)?;
        tracing::trace!(
            code = %reply.status.code,
            records = reply.records.len(),
            "Record.List response"
        );

        Ok(ResolveResponse {
            code: reply.status.code,
            message: reply.status.message,
            timestamp: reply.status.created_at,
            record_id: reply.records.into_iter().next().map(|r| r.id),
        })
    }

    fn decode_update_response(&self, body: &[u8]) -> Result<UpdateResponse> {
        let reply: RecordDdnsReply = decode_json(body)?;
        tracing::trace!(code = %reply.status.code, "Record.Ddns response");

        Ok(UpdateResponse {
            code: reply.status.code,
            message: reply.status.message,
            timestamp: reply.status.created_at,
            record_value: reply.record.map(|r| r.value).unwrap_or_default(),
        })
    }

    fn status_codes(&self) -> &StatusCodeTable {
        &self.table
    }
}

/// Factory for creating DNSPod codecs
pub struct DnspodFactory;

impl CodecFactory for DnspodFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn Codec>> {
        match config {
            ProviderConfig::Dnspod {
                login_token,
                format,
                lang,
                error_on_empty,
            } => Ok(Arc::new(DnspodCodec::with_options(
                login_token.clone(),
                format.clone(),
                lang.clone(),
                error_on_empty.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for DNSPod codec")),
        }
    }
}

/// Register the DNSPod codec with a registry
///
/// # Example
///
/// ```rust,ignore
/// use ddns_core::CodecRegistry;
/// use ddns_provider_dnspod::register;
///
/// let registry = CodecRegistry::new();
/// register(&registry);
/// ```
pub fn register(registry: &CodecRegistry) {
    registry.register_codec(PROVIDER_NAME, Box::new(DnspodFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::params::RecordId;
    use ddns_core::status::State;
    use ddns_core::traits::CodeMapping;

    fn codec() -> DnspodCodec {
        DnspodCodec::new("12345,secret-token").unwrap()
    }

    fn params() -> Parameters {
        Parameters::new("example.com", "www", "203.0.113.7")
    }

    fn form(body: &[u8]) -> Vec<(String, String)> {
        serde_urlencoded::from_bytes(body).unwrap()
    }

    #[test]
    fn test_factory_creation() {
        let factory = DnspodFactory;
        let codec = factory.create(&ProviderConfig::dnspod("12345,secret-token"));
        assert!(codec.is_ok());
        assert_eq!(codec.unwrap().name(), "dnspod");
    }

    #[test]
    fn test_factory_missing_token() {
        let factory = DnspodFactory;
        let result = factory.create(&ProviderConfig::dnspod(""));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_factory_rejects_other_config() {
        let config = ProviderConfig::Custom {
            factory: "dnspod".to_string(),
            config: serde_json::json!({}),
        };
        assert!(DnspodFactory.create(&config).is_err());
    }

    #[test]
    fn register_adds_dnspod() {
        let registry = CodecRegistry::new();
        register(&registry);
        assert!(registry.has_codec("dnspod"));
        assert!(
            registry
                .create_codec(&ProviderConfig::dnspod("1,t"))
                .is_ok()
        );
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", codec());
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<REDACTED>"));
    }

    #[test]
    fn resolve_request_fields() {
        let body = codec().encode_resolve_request(&params()).unwrap();
        let fields = form(&body);
        let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "login_token",
                "format",
                "lang",
                "error_on_empty",
                "domain",
                "sub_domain",
                "record_line",
                "record_type"
            ]
        );
        assert!(fields.contains(&("record_type".to_string(), "A".to_string())));
        assert!(fields.contains(&("record_line".to_string(), "默认".to_string())));
    }

    #[test]
    fn update_request_needs_record_id() {
        let codec = codec();
        let mut params = params();
        assert!(codec.encode_update_request(&params).is_err());

        params.record_id = RecordId::new(987);
        let fields = form(&codec.encode_update_request(&params).unwrap());
        assert!(fields.contains(&("record_id".to_string(), "987".to_string())));
        assert!(fields.contains(&("ttl".to_string(), "600".to_string())));
        assert!(fields.contains(&("value".to_string(), "203.0.113.7".to_string())));
    }

    #[test]
    fn ipv6_value_selects_aaaa() {
        let params = Parameters::new("example.com", "v6", "2001:db8::1");
        let fields = form(&codec().encode_resolve_request(&params).unwrap());
        assert!(fields.contains(&("record_type".to_string(), "AAAA".to_string())));
    }

    #[test]
    fn decode_record_list() {
        let body = br#"{
            "status": {"code": "1", "message": "Action completed successful", "created_at": "2024-05-01 10:00:00"},
            "domain": {"id": "1", "name": "example.com"},
            "records": [
                {"id": "16894439", "name": "www", "type": "A", "value": "203.0.113.1", "ttl": "600"},
                {"id": "16894440", "name": "www", "type": "A", "value": "203.0.113.2", "ttl": "600"}
            ]
        }"#;
        let response = codec().decode_resolve_response(body).unwrap();
        assert_eq!(response.code, "1");
        assert_eq!(response.timestamp, "2024-05-01 10:00:00");
        assert_eq!(response.record_id.as_deref(), Some("16894439"));
    }

    #[test]
    fn decode_record_list_without_records() {
        let body = br#"{"status": {"code": "10", "message": "No records", "created_at": "2024-05-01 10:00:00"}}"#;
        let response = codec().decode_resolve_response(body).unwrap();
        assert!(response.record_id.is_none());
        assert_eq!(
            codec().status_codes().map(&response.code),
            CodeMapping::Failed {
                description: Some("no records found")
            }
        );
    }

    #[test]
    fn decode_record_ddns() {
        let body = br#"{
            "status": {"code": "1", "message": "Action completed successful", "created_at": "2024-05-01 10:00:01"},
            "record": {"id": 16894439, "name": "www", "value": "203.0.113.7"}
        }"#;
        let response = codec().decode_update_response(body).unwrap();
        assert_eq!(response.record_value, "203.0.113.7");
        assert_eq!(codec().status_codes().map(&response.code).state(), State::Success);
    }

    #[test]
    fn garbage_is_decode_error() {
        let err = codec().decode_update_response(b"<html>502</html>").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn missing_status_maps_to_empty() {
        let response = codec().decode_update_response(b"{}").unwrap();
        assert_eq!(codec().status_codes().map(&response.code), CodeMapping::Empty);
    }
}
