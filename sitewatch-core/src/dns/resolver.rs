use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, instrument};

use crate::error::{Result, WatchError};
use crate::metric::{round2, Metric};

/// Default lifetime of an A-record lookup (5 seconds).
/// A resolver that has not answered by then is treated as failed.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const NOTE_DNS_FAILED: &str = "DNS lookup failed.";

/// Result of timing one A-record resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsOutcome {
    pub time_ms: Metric<f64>,
    /// First resolved address; `None` whenever the lookup failed
    pub address: Option<Ipv4Addr>,
    pub note: Option<&'static str>,
}

impl DnsOutcome {
    pub fn resolved(time_ms: f64, address: Ipv4Addr) -> Self {
        Self {
            time_ms: Metric::Measured(round2(time_ms)),
            address: Some(address),
            note: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            time_ms: Metric::Failed,
            address: None,
            note: Some(NOTE_DNS_FAILED),
        }
    }
}

/// Times A-record resolution for a hostname.
///
/// Uses the system resolver configuration unless a nameserver is given.
#[derive(Debug, Clone)]
pub struct DnsProbe {
    timeout: Duration,
    nameserver: Option<String>,
}

impl Default for DnsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsProbe {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            nameserver: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query this resolver (IP address) instead of the system configuration.
    pub fn with_nameserver(mut self, nameserver: Option<String>) -> Self {
        self.nameserver = nameserver;
        self
    }

    fn create_resolver(&self) -> Result<TokioAsyncResolver> {
        let config = match self.nameserver.as_deref() {
            Some(ns) => {
                let ip: IpAddr = ns
                    .parse()
                    .map_err(|_| WatchError::DnsError(format!("invalid nameserver IP: {}", ns)))?;

                let mut config = ResolverConfig::new();
                config.add_name_server(NameServerConfig::new(SocketAddr::new(ip, 53), Protocol::Udp));
                config
            }
            None => match hickory_resolver::system_conf::read_system_conf() {
                Ok((config, _)) => config,
                Err(e) => {
                    debug!(error = %e, "No system resolver configuration, using Google DNS");
                    ResolverConfig::google()
                }
            },
        };

        let mut opts = ResolverOpts::default();
        opts.timeout = self.timeout;
        opts.attempts = 1;
        opts.use_hosts_file = false;
        // Every probe should measure a real round trip
        opts.cache_size = 0;

        Ok(TokioAsyncResolver::tokio(config, opts))
    }

    /// Resolve `hostname` and time it. Never fails: any error becomes
    /// [`DnsOutcome::failed`].
    #[instrument(skip(self), fields(hostname = %hostname))]
    pub async fn probe(&self, hostname: &str) -> DnsOutcome {
        let start = Instant::now();
        match self.resolve_first(hostname).await {
            Ok(address) => {
                let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                debug!(%address, elapsed_ms = elapsed, "DNS lookup succeeded");
                DnsOutcome::resolved(elapsed, address)
            }
            Err(e) => {
                debug!(error = %e, "DNS lookup failed");
                DnsOutcome::failed()
            }
        }
    }

    async fn resolve_first(&self, hostname: &str) -> Result<Ipv4Addr> {
        if hostname.is_empty() {
            return Err(WatchError::DnsError("empty hostname".to_string()));
        }
        if let Ok(address) = hostname.parse::<Ipv4Addr>() {
            return Ok(address);
        }

        let resolver = self.create_resolver()?;
        let response = tokio::time::timeout(self.timeout, resolver.ipv4_lookup(hostname))
            .await
            .map_err(|_| WatchError::Timeout(format!("A lookup for {} timed out", hostname)))?
            .map_err(|e| WatchError::DnsError(format!("A lookup failed: {}", e)))?;

        response
            .iter()
            .next()
            .map(|record| record.0)
            .ok_or_else(|| WatchError::DnsError(format!("no A records for {}", hostname)))
    }
}
