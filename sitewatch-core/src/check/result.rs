use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metric::Metric;
use crate::status::{KeywordCheck, SiteStatus};

/// Log columns, in write order.
pub const CSV_HEADER: [&str; 15] = [
    "DateTime",
    "Website Name",
    "URL",
    "Status",
    "Ping (ms)",
    "HTTP Time (ms)",
    "DNS Time (ms)",
    "Content Size (KB)",
    "Redirects",
    "Keyword Check",
    "SSL Days Left",
    "SSL Expiry Date",
    "Domain Days Left",
    "Domain Expiry Date",
    "Notes",
];

/// One site, one round. Never mutated after composition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub checked_at: DateTime<Utc>,
    pub name: String,
    pub url: String,
    pub status: SiteStatus,
    pub ping_ms: Metric<f64>,
    pub http_ms: Metric<f64>,
    pub dns_ms: Metric<f64>,
    pub content_kb: Metric<f64>,
    pub redirects: u32,
    pub keyword: KeywordCheck,
    pub ssl_days_left: Metric<i64>,
    pub ssl_expires_at: Metric<DateTime<Utc>>,
    pub domain_days_left: Metric<i64>,
    pub domain_expires_at: Metric<DateTime<Utc>>,
    pub notes: String,
}

impl CheckResult {
    /// The record before any probe has reported.
    pub fn initial(name: &str, url: &str, checked_at: DateTime<Utc>) -> Self {
        Self {
            checked_at,
            name: name.to_string(),
            url: url.to_string(),
            status: SiteStatus::Down,
            ping_ms: Metric::Failed,
            http_ms: Metric::Failed,
            dns_ms: Metric::Failed,
            content_kb: Metric::Failed,
            redirects: 0,
            keyword: KeywordCheck::Skipped,
            ssl_days_left: Metric::Unavailable,
            ssl_expires_at: Metric::Unavailable,
            domain_days_left: Metric::Unavailable,
            domain_expires_at: Metric::Unavailable,
            notes: String::new(),
        }
    }

    /// Render every field in [`CSV_HEADER`] order.
    pub fn to_row(&self) -> [String; 15] {
        [
            self.checked_at.to_rfc3339(),
            self.name.clone(),
            self.url.clone(),
            self.status.to_string(),
            self.ping_ms.render(),
            self.http_ms.render(),
            self.dns_ms.render(),
            self.content_kb.render(),
            self.redirects.to_string(),
            self.keyword.to_string(),
            self.ssl_days_left.render(),
            self.ssl_expires_at.render(),
            self.domain_days_left.render(),
            self.domain_expires_at.render(),
            self.notes.clone(),
        ]
    }

    pub fn ssl_expiring_within(&self, days: i64) -> bool {
        matches!(self.ssl_days_left, Metric::Measured(left) if left <= days)
    }

    pub fn domain_expiring_within(&self, days: i64) -> bool {
        matches!(self.domain_days_left, Metric::Measured(left) if left <= days)
    }
}
