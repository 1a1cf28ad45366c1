//! Domain registration expiry probe.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, instrument};

use crate::cache::TtlCache;
use crate::config::Settings;
use crate::metric::{days_until, Metric};
use crate::validation::registrable_domain;
use crate::whois::{RegistryLookup, RegistryRecord, WhoisClient};

pub const NOTE_DOMAIN_NOT_AVAILABLE: &str = "Domain check failed: N/A.";
pub const NOTE_DOMAIN_WHOIS_FAILED: &str = "Domain check failed: WHOIS Failed.";

#[derive(Debug, Clone, PartialEq)]
pub struct DomainOutcome {
    pub days_left: Metric<i64>,
    pub expires_at: Metric<DateTime<Utc>>,
    pub note: Option<&'static str>,
}

impl DomainOutcome {
    pub fn from_expiry(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            days_left: Metric::Measured(days_until(expires_at, now)),
            expires_at: Metric::Measured(expires_at),
            note: None,
        }
    }

    /// No usable date, or no registry to ask.
    pub fn not_available() -> Self {
        Self {
            days_left: Metric::Unavailable,
            expires_at: Metric::Unavailable,
            note: Some(NOTE_DOMAIN_NOT_AVAILABLE),
        }
    }

    pub fn lookup_failed() -> Self {
        Self {
            days_left: Metric::LookupFailed,
            expires_at: Metric::Unavailable,
            note: Some(NOTE_DOMAIN_WHOIS_FAILED),
        }
    }
}

/// Looks up registration expiry through a [`RegistryLookup`].
///
/// Built without a registry, every probe degrades to N/A.
pub struct DomainExpiryProbe {
    registry: Option<Arc<dyn RegistryLookup>>,
    cache: TtlCache<String, RegistryRecord>,
}

impl DomainExpiryProbe {
    pub fn new(registry: Arc<dyn RegistryLookup>, cache_ttl: Duration) -> Self {
        Self {
            registry: Some(registry),
            cache: TtlCache::new(cache_ttl),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            registry: None,
            cache: TtlCache::new(Duration::ZERO),
        }
    }

    /// WHOIS over port 43 when enabled in `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.whois_enabled {
            Self::new(Arc::new(WhoisClient::new()), settings.whois_cache_ttl())
        } else {
            Self::unavailable()
        }
    }

    pub fn is_available(&self) -> bool {
        self.registry.is_some()
    }

    #[instrument(skip(self), fields(hostname = %hostname))]
    pub async fn probe(&self, hostname: &str) -> DomainOutcome {
        let registry = match &self.registry {
            Some(registry) => registry,
            None => {
                debug!("No registry lookup configured");
                return DomainOutcome::not_available();
            }
        };

        let domain = registrable_domain(hostname);
        let record = match self.cache.get(&domain) {
            Some(record) => record,
            None => {
                // Evict stale entries before the map grows
                self.cache.cleanup();
                match registry.lookup(&domain).await {
                    Ok(record) => {
                        self.cache.insert(domain.clone(), record.clone());
                        record
                    }
                    Err(e) => {
                        debug!(error = %e, "Registry lookup failed");
                        return DomainOutcome::lookup_failed();
                    }
                }
            }
        };

        match first_expiration(&record.expiration_candidates) {
            Some(expires_at) => DomainOutcome::from_expiry(expires_at, Utc::now()),
            None => {
                debug!(
                    server = %record.server,
                    candidates = record.expiration_candidates.len(),
                    "No usable expiration date"
                );
                DomainOutcome::not_available()
            }
        }
    }
}


/// First candidate that parses as a date, in document order.
pub fn first_expiration(candidates: &[String]) -> Option<DateTime<Utc>> {
    candidates.iter().find_map(|value| parse_date(value))
}

/// Parse a registry date. Values without an offset are taken as UTC and
/// date-only values as midnight UTC.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let cleaned = trimmed
        .replace(" (UTC)", "")
        .replace(" UTC", "")
        .replace(" GMT", "")
        .replace(" +0000", "");

    let datetime_formats = [
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y.%m.%d %H:%M:%S",
        "%d-%b-%Y %H:%M:%S",
    ];
    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt.and_utc());
        }
    }

    let date_formats = [
        "%Y-%m-%d",
        "%d-%b-%Y",
        "%d-%B-%Y",
        "%d %b %Y",
        "%d %B %Y",
        "%Y.%m.%d",
        "%Y/%m/%d",
        "%d.%m.%Y",
        "%d/%m/%Y",
        "%b %d %Y",
    ];
    for fmt in &date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}
