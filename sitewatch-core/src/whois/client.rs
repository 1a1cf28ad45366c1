use std::collections::HashSet;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, instrument, warn};

use super::parsers::PARSER_REGISTRY;
use super::record::{LookupFuture, RegistryLookup, RegistryRecord};
use super::servers::{get_tld, get_whois_server, IANA_WHOIS_SERVER};
use crate::error::{Result, WatchError};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::validation::normalize_domain;

const WHOIS_PORT: u16 = 43;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_SIZE: usize = 1024 * 1024; // 1MB
const MAX_REFERRAL_DEPTH: u8 = 3;

static REFERRAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:Registrar WHOIS Server|Whois Server|ReferralServer)[ \t]*:[ \t]*(?:whois://)?(\S+)")
        .expect("Invalid referral regex")
});

static IANA_REFER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:refer|whois)[ \t]*:[ \t]*(\S+)").expect("Invalid IANA refer regex")
});

/// WHOIS client speaking the port-43 protocol.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    timeout: Duration,
    port: u16,
    retry_policy: RetryPolicy,
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WhoisClient {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            port: WHOIS_PORT,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn lookup_domain(&self, domain: &str) -> Result<RegistryRecord> {
        let domain = normalize_domain(domain)?;
        let tld = get_tld(&domain).ok_or_else(|| WatchError::InvalidDomain(domain.clone()))?;

        let server = match get_whois_server(tld) {
            Some(server) => server.to_string(),
            None => self.discover_server(tld).await?,
        };

        self.lookup_with_server(&domain, &server).await
    }

    /// Query `server` directly, following registrar referrals from there.
    pub async fn lookup_with_server(&self, domain: &str, server: &str) -> Result<RegistryRecord> {
        let executor = RetryExecutor::new(self.retry_policy.clone());
        executor
            .execute(|| async move {
                let mut visited = HashSet::new();
                self.lookup_with_referrals(domain, server, 0, &mut visited)
                    .await
            })
            .await
    }

    /// Ask IANA which server is authoritative for `tld`.
    async fn discover_server(&self, tld: &str) -> Result<String> {
        debug!(tld = %tld, "TLD not in table, asking IANA");
        let response = self.query_server(IANA_WHOIS_SERVER, tld).await?;
        IANA_REFER
            .captures(&response)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_lowercase())
            .filter(|server| server.contains('.'))
            .ok_or_else(|| WatchError::WhoisServerNotFound(tld.to_string()))
    }

    fn lookup_with_referrals<'a>(
        &'a self,
        domain: &'a str,
        whois_server: &'a str,
        depth: u8,
        visited: &'a mut HashSet<String>,
    ) -> LookupFuture<'a> {
        Box::pin(async move {
            visited.insert(whois_server.to_lowercase());

            debug!(whois_server = %whois_server, depth = depth, "Querying WHOIS server");
            let raw_response = self.query_server(whois_server, domain).await?;
            let record = PARSER_REGISTRY.parse(domain, whois_server, &raw_response);

            let referral = extract_referral(&raw_response)
                .filter(|referral| !visited.contains(referral));

            match referral {
                Some(referral) if depth + 1 < MAX_REFERRAL_DEPTH => {
                    debug!(referral = %referral, "Following referral");
                    match self
                        .lookup_with_referrals(domain, &referral, depth + 1, visited)
                        .await
                    {
                        // Registrar servers often omit the registry expiry
                        Ok(referred) if !referred.expiration_candidates.is_empty() => Ok(referred),
                        Ok(_) => Ok(record),
                        Err(e) => {
                            warn!(referral = %referral, error = %e, "Referral failed, using registry response");
                            Ok(record)
                        }
                    }
                }
                Some(referral) => {
                    warn!(depth = depth, referral = %referral, "Max referral depth reached");
                    Ok(record)
                }
                None => Ok(record),
            }
        })
    }

    /// One request/response exchange, bounded as a whole by `self.timeout`.
    async fn query_server(&self, server: &str, query: &str) -> Result<String> {
        let deadline = Instant::now() + self.timeout;

        let mut stream = timeout_at(deadline, TcpStream::connect((server, self.port)))
            .await
            .map_err(|_| WatchError::Timeout(format!("Connection to {} timed out", server)))?
            .map_err(|e| WatchError::WhoisError(format!("Failed to connect to {}: {}", server, e)))?;

        let query_bytes = format!("{}\r\n", query);
        timeout_at(deadline, stream.write_all(query_bytes.as_bytes()))
            .await
            .map_err(|_| WatchError::Timeout("Write timed out".to_string()))?
            .map_err(|e| WatchError::WhoisError(format!("Failed to send query: {}", e)))?;

        let mut response = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            match timeout_at(deadline, stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    response.extend_from_slice(&buf[..n]);
                    if response.len() > MAX_RESPONSE_SIZE {
                        return Err(WatchError::WhoisError("Response too large".to_string()));
                    }
                }
                Ok(Err(e)) => {
                    return Err(WatchError::WhoisError(format!("Read error: {}", e)));
                }
                Err(_) => {
                    // Some servers never close or trickle forever; keep what already arrived
                    if !response.is_empty() {
                        break;
                    }
                    return Err(WatchError::Timeout("Read timed out".to_string()));
                }
            }
        }

        // Latin-1 fallback for registries that do not send UTF-8
        Ok(match String::from_utf8(response) {
            Ok(text) => text,
            Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
        })
    }
}

impl RegistryLookup for WhoisClient {
    fn lookup<'a>(&'a self, domain: &'a str) -> LookupFuture<'a> {
        Box::pin(self.lookup_domain(domain))
    }
}

fn extract_referral(response: &str) -> Option<String> {
    REFERRAL
        .captures_iter(response)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_end_matches('/').to_lowercase())
        .find(|server| server.contains('.'))
}
