// # ddns - DDNS update runner
//
// A thin integration layer: all update logic lives in ddns-core.
//
// The binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering provider codecs
// 4. Running one update attempt per configured record and reporting each status
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Provider
// - `DDNS_PROVIDER_TYPE`: Provider type (dnspod)
// - `DDNS_PROVIDER_LOGIN_TOKEN`: Login token (`id,token`)
//
// ### Records
// - `DDNS_DOMAIN`: Registered domain (e.g., example.com)
// - `DDNS_SUBDOMAINS`: Comma-separated host parts (e.g., www,@)
// - `DDNS_VALUE`: Value to write (e.g., the current public IP)
// - `DDNS_RECORD_TYPE`: A, AAAA, CNAME, TXT or auto (default: auto)
// - `DDNS_RECORD_LINE`: Provider line (default: 默认)
// - `DDNS_TTL`: Record TTL in seconds (default: 600)
//
// ### Transport
// - `DDNS_PROXIES`: Comma-separated proxy URLs, tried in order
// - `DDNS_USE_PROXY`: Route requests through `DDNS_PROXIES` (default: false)
// - `DDNS_RESOLVE_TIMEOUT_SECS`: Record id resolution deadline (default: 20)
// - `DDNS_HTTP_TIMEOUT_SECS`: Per-request HTTP timeout (default: 30)
// - `DDNS_WORKER_POOL_SIZE`: Concurrent resolution tasks (default: 4)
//
// ### Logging
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `DDNS_LOG_FILE`: Also append log output to this file
//
// ## Example
//
// ```bash
// export DDNS_PROVIDER_TYPE=dnspod
// export DDNS_PROVIDER_LOGIN_TOKEN=12345,your_token
// export DDNS_DOMAIN=example.com
// export DDNS_SUBDOMAINS=www,home
// export DDNS_VALUE=203.0.113.7
//
// ddns
// ```

use anyhow::{Context, Result};
use ddns_core::config::{DdnsConfig, OrchestratorConfig, ProviderConfig, RecordConfig, RecordType};
use ddns_core::orchestrator::AttemptEvent;
use ddns_core::{
    ClientPool, CodecRegistry, Parameters, ProxyList, ReqwestClient, RequestOrchestrator, Status,
    WorkerPool,
};
use std::env;
use std::fs::OpenOptions;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// How long queued attempt events may take to drain at exit
const EVENT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Exit codes for different termination scenarios
///
/// - 0: Every record was updated
/// - 1: Configuration or startup error
/// - 2: At least one update failed
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// All updates succeeded
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// One or more updates failed (or timed out)
    UpdateFailed = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    provider_type: String,
    provider_login_token: String,
    domain: String,
    subdomains: Vec<String>,
    record_type: RecordType,
    record_line: Option<String>,
    ttl: Option<u32>,
    value: String,
    proxies: Vec<String>,
    use_proxy: bool,
    resolve_timeout_secs: Option<u64>,
    http_timeout_secs: Option<u64>,
    worker_pool_size: Option<usize>,
    log_level: String,
    log_file: Option<String>,
}

// Custom Debug implementation that hides the login token
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("provider_type", &self.provider_type)
            .field("provider_login_token", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("subdomains", &self.subdomains)
            .field("record_type", &self.record_type)
            .field("value", &self.value)
            .field("proxies", &self.proxies.len())
            .field("use_proxy", &self.use_proxy)
            .finish_non_exhaustive()
    }
}

/// Read an optional variable, failing if it is set but unparsable
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            provider_type: env::var("DDNS_PROVIDER_TYPE").unwrap_or_else(|_| "dnspod".to_string()),
            provider_login_token: env::var("DDNS_PROVIDER_LOGIN_TOKEN")
                .context("DDNS_PROVIDER_LOGIN_TOKEN is not set")?,
            domain: env::var("DDNS_DOMAIN").unwrap_or_default().trim().to_string(),
            subdomains: split_list(&env::var("DDNS_SUBDOMAINS").unwrap_or_default()),
            record_type: env::var("DDNS_RECORD_TYPE")
                .unwrap_or_default()
                .parse()
                .map_err(|e| anyhow::anyhow!("DDNS_RECORD_TYPE: {}", e))?,
            record_line: env::var("DDNS_RECORD_LINE").ok().filter(|s| !s.is_empty()),
            ttl: parse_var("DDNS_TTL")?,
            value: env::var("DDNS_VALUE").unwrap_or_default().trim().to_string(),
            proxies: split_list(&env::var("DDNS_PROXIES").unwrap_or_default()),
            use_proxy: parse_var("DDNS_USE_PROXY")?.unwrap_or(false),
            resolve_timeout_secs: parse_var("DDNS_RESOLVE_TIMEOUT_SECS")?,
            http_timeout_secs: parse_var("DDNS_HTTP_TIMEOUT_SECS")?,
            worker_pool_size: parse_var("DDNS_WORKER_POOL_SIZE")?,
            log_level: env::var("DDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_file: env::var("DDNS_LOG_FILE").ok().filter(|s| !s.is_empty()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks required fields, domain labels, numeric ranges and the log
    /// level. Record values and proxy URLs are checked again by
    /// `DdnsConfig::validate`.
    fn validate(&self) -> Result<()> {
        if self.provider_login_token.trim().is_empty() {
            anyhow::bail!(
                "DDNS_PROVIDER_LOGIN_TOKEN is required. \
                Set it via: export DDNS_PROVIDER_LOGIN_TOKEN=id,token"
            );
        }

        // DNSPod tokens are `<numeric id>,<token>`
        if self.provider_type == "dnspod" {
            let well_formed = self
                .provider_login_token
                .split_once(',')
                .is_some_and(|(id, token)| {
                    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && !token.is_empty()
                });
            if !well_formed {
                anyhow::bail!(
                    "DDNS_PROVIDER_LOGIN_TOKEN must have the form <id>,<token> for dnspod"
                );
            }
        }

        if self.domain.is_empty() {
            anyhow::bail!(
                "DDNS_DOMAIN is required. Set it via: export DDNS_DOMAIN=example.com"
            );
        }
        validate_domain_name(&self.domain)?;

        if self.subdomains.is_empty() {
            anyhow::bail!(
                "DDNS_SUBDOMAINS must contain at least one host. \
                Set it via: export DDNS_SUBDOMAINS=www,@"
            );
        }
        for subdomain in &self.subdomains {
            if subdomain != "@" && subdomain != "*" {
                validate_domain_name(subdomain)?;
            }
        }

        if self.value.is_empty() {
            anyhow::bail!("DDNS_VALUE is required. Set it via: export DDNS_VALUE=203.0.113.7");
        }

        if self.use_proxy && self.proxies.is_empty() {
            anyhow::bail!("DDNS_USE_PROXY is set but DDNS_PROXIES is empty");
        }

        if let Some(ttl) = self.ttl
            && !(1..=604_800).contains(&ttl)
        {
            anyhow::bail!("DDNS_TTL must be between 1 and 604800 seconds. Got: {}", ttl);
        }

        if let Some(secs) = self.resolve_timeout_secs
            && !(1..=300).contains(&secs)
        {
            anyhow::bail!(
                "DDNS_RESOLVE_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                secs
            );
        }

        if let Some(secs) = self.http_timeout_secs
            && !(1..=300).contains(&secs)
        {
            anyhow::bail!(
                "DDNS_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                secs
            );
        }

        if let Some(size) = self.worker_pool_size
            && !(1..=64).contains(&size)
        {
            anyhow::bail!("DDNS_WORKER_POOL_SIZE must be between 1 and 64. Got: {}", size);
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the library configuration
    fn to_ddns_config(&self) -> DdnsConfig {
        let provider = match self.provider_type.as_str() {
            "dnspod" => ProviderConfig::dnspod(self.provider_login_token.clone()),
            other => ProviderConfig::Custom {
                factory: other.to_string(),
                config: serde_json::json!({ "login_token": self.provider_login_token }),
            },
        };

        let records = self
            .subdomains
            .iter()
            .map(|subdomain| {
                let mut record = RecordConfig::new(&self.domain, subdomain, &self.value)
                    .with_record_type(self.record_type);
                if let Some(line) = &self.record_line {
                    record.line = line.clone();
                }
                if let Some(ttl) = self.ttl {
                    record = record.with_ttl(ttl);
                }
                record
            })
            .collect();

        let defaults = OrchestratorConfig::default();
        let orchestrator = OrchestratorConfig {
            resolve_timeout_secs: self
                .resolve_timeout_secs
                .unwrap_or(defaults.resolve_timeout_secs),
            http_timeout_secs: self.http_timeout_secs.unwrap_or(defaults.http_timeout_secs),
            worker_pool_size: self.worker_pool_size.unwrap_or(defaults.worker_pool_size),
            use_proxy: self.use_proxy,
            ..defaults
        };

        DdnsConfig {
            provider,
            records,
            proxies: self.proxies.clone(),
            orchestrator,
        }
    }
}

/// Validate that a string is a valid domain name (or host part)
///
/// Basic RFC 1035 checks; internationalized names are accepted as long as
/// each label is alphanumeric.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

/// Install the global subscriber, teeing to `log_file` when set
fn init_tracing(level: Level, log_file: Option<&str>) -> Result<()> {
    let builder = FmtSubscriber::builder().with_max_level(level);

    let subscriber = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open DDNS_LOG_FILE {path}"))?;
            let writer = BoxMakeWriter::new(std::io::stdout.and(Mutex::new(file)));
            builder.with_ansi(false).with_writer(writer).finish()
        }
        None => builder.with_writer(BoxMakeWriter::new(std::io::stdout)).finish(),
    };

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let ddns_config = config.to_ddns_config();
    if let Err(e) = ddns_config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if let Err(e) = init_tracing(log_level, config.log_file.as_deref()) {
        eprintln!("{:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddns");
    debug!(?config, "configuration loaded");
    info!(
        "Configuration loaded: {} record(s) under {}",
        ddns_config.records.len(),
        config.domain
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    rt.block_on(async {
        match run(ddns_config).await {
            Ok(true) => DdnsExitCode::Success,
            Ok(false) => DdnsExitCode::UpdateFailed,
            Err(e) => {
                error!("Startup error: {:#}", e);
                DdnsExitCode::ConfigError
            }
        }
    })
    .into()
}

/// Run one attempt per record
///
/// Returns `Ok(true)` when every record was updated, `Ok(false)` when at
/// least one attempt failed, and `Err` when the orchestrator could not be set up.
async fn run(config: DdnsConfig) -> Result<bool> {
    let registry = CodecRegistry::new();

    #[cfg(feature = "dnspod")]
    {
        info!("Registering DNSPod codec");
        ddns_provider_dnspod::register(&registry);
    }

    let provider_type = config.provider.type_name();
    if !registry.has_codec(provider_type) {
        anyhow::bail!(
            "DDNS_PROVIDER_TYPE '{}' is not supported. Supported providers: {}",
            provider_type,
            registry.codec_names().join(", ")
        );
    }
    let codec = registry.create_codec(&config.provider)?;

    let settings = &config.orchestrator;
    let http_timeout = settings.http_timeout();
    let clients = Arc::new(ClientPool::new(settings.max_idle_clients, move || {
        ReqwestClient::new(http_timeout)
    }));
    let workers = WorkerPool::new(settings.worker_pool_size);
    let proxies = ProxyList::parse(&config.proxies)?;

    if settings.use_proxy {
        info!("Routing requests through {} proxies", proxies.len());
    } else if !proxies.is_empty() {
        warn!(
            "{} proxies configured but DDNS_USE_PROXY is not set; connecting directly",
            proxies.len()
        );
    }

    let (orchestrator, events) =
        RequestOrchestrator::new(codec, Arc::clone(&clients), workers, settings, proxies)?;
    let orchestrator = Arc::new(orchestrator);

    let event_logger = tokio::spawn(log_events(events));

    let mut attempts = JoinSet::new();
    for record in &config.records {
        let orchestrator = Arc::clone(&orchestrator);
        let mut params = Parameters::from(record);
        attempts.spawn(async move { orchestrator.execute(&mut params).await });
    }

    let mut all_succeeded = true;
    while let Some(joined) = attempts.join_next().await {
        match joined {
            Ok(outcome) => {
                report(&outcome.status);
                if !outcome.is_success() {
                    all_succeeded = false;
                }
            }
            Err(e) => {
                error!("Update task failed to complete: {}", e);
                all_succeeded = false;
            }
        }
    }

    drop(orchestrator);
    let logged = finish_event_logger(event_logger, EVENT_DRAIN_GRACE).await;
    debug!(?logged, "attempt events logged");
    debug!(
        outstanding = clients.outstanding(),
        idle = clients.idle(),
        "client pool at exit"
    );

    Ok(all_succeeded)
}

/// Log attempt events until every sender is gone, returning how many were seen
async fn log_events(mut events: mpsc::Receiver<AttemptEvent>) -> usize {
    let mut seen = 0;
    while let Some(event) = events.recv().await {
        log_event(&event);
        seen += 1;
    }
    seen
}

/// Wait for the event logger to drain the queue
///
/// Resolution tasks abandoned by the deadline keep a sender alive until their
/// HTTP request ends, so the wait is bounded by `grace`. Returns `None` when
/// the logger had to be aborted.
async fn finish_event_logger(mut logger: JoinHandle<usize>, grace: Duration) -> Option<usize> {
    match tokio::time::timeout(grace, &mut logger).await {
        Ok(Ok(seen)) => Some(seen),
        Ok(Err(e)) => {
            warn!("Event logger failed: {}", e);
            None
        }
        Err(_) => {
            warn!("Event logger still waiting after {:?}, aborting", grace);
            logger.abort();
            None
        }
    }
}

fn log_event(event: &AttemptEvent) {
    match event {
        AttemptEvent::PhaseEntered { target, phase } => {
            debug!(record = %target, %phase, "phase entered");
        }
        AttemptEvent::PostAttempted {
            target,
            url,
            proxy,
            succeeded,
        } => {
            debug!(
                record = %target,
                url = %url,
                proxy = proxy.as_deref().unwrap_or("direct"),
                succeeded,
                "POST attempted"
            );
        }
        AttemptEvent::Finished { target, state } => {
            info!(record = %target, %state, "attempt finished");
        }
    }
}

/// Print the final status of one attempt
fn report(status: &Status) {
    if status.is_success() {
        info!("{}", status);
    } else {
        error!("{}", status);
    }
    println!("{}", status);
}
