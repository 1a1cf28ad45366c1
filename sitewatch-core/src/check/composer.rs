use chrono::{DateTime, Utc};

use super::result::CheckResult;
use crate::alert::Alert;
use crate::config::SiteConfig;
use crate::dns::DnsOutcome;
use crate::domain_expiry::DomainOutcome;
use crate::ping::PingOutcome;
use crate::status::{HttpOutcome, SiteStatus, TlsOutcome};

/// Everything the probes reported for one site, in probe order.
#[derive(Debug, Clone)]
pub struct ProbeOutputs {
    pub dns: DnsOutcome,
    pub ping: PingOutcome,
    /// `None` when the HTTP probe could not run at all
    pub http: Option<HttpOutcome>,
    pub tls: TlsOutcome,
    pub domain: DomainOutcome,
}

/// A composed record plus the alert it raised, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteReport {
    pub record: CheckResult,
    pub alert: Option<Alert>,
}

/// Fold probe outputs into one record. Pure: no I/O, no clock.
pub fn compose(
    site: &SiteConfig,
    checked_at: DateTime<Utc>,
    slow_threshold_ms: f64,
    probes: ProbeOutputs,
) -> SiteReport {
    let mut record = CheckResult::initial(&site.name, &site.url, checked_at);
    let mut notes: Vec<String> = Vec::new();

    record.dns_ms = probes.dns.time_ms;
    notes.extend(probes.dns.note.map(str::to_string));

    record.ping_ms = probes.ping.rtt_ms;
    notes.extend(probes.ping.note.map(str::to_string));

    let mut alert = None;
    if let Some(http) = probes.http {
        record.status = http.status;
        record.http_ms = http.time_ms;
        record.content_kb = http.content_kb;
        record.redirects = http.redirects;
        record.keyword = http.keyword;
        notes.extend(http.notes);
        alert = http
            .alert
            .map(|reason| Alert::new(&site.name, &site.url, reason, checked_at));
    }

    record.ssl_days_left = probes.tls.days_left;
    record.ssl_expires_at = probes.tls.expires_at;
    notes.extend(probes.tls.note.map(str::to_string));

    record.domain_days_left = probes.domain.days_left;
    record.domain_expires_at = probes.domain.expires_at;
    notes.extend(probes.domain.note.map(str::to_string));

    // Sentinel HTTP times never escalate
    if record.status.is_up() {
        if let Some(&http_ms) = record.http_ms.measured() {
            if http_ms > slow_threshold_ms {
                record.status = SiteStatus::UpSlow;
            }
        }
    }

    record.notes = notes.join(" ").trim().to_string();

    SiteReport { record, alert }
}
