use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::alert::AlertReason;
use crate::metric::{days_until, Metric};

pub const NOTE_HTTP_FAILED: &str = "HTTP request failed.";
pub const NOTE_SSL_FAILED: &str = "SSL check failed.";

/// Overall status of a site for one round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    Up,
    /// Up, but the HTTP time exceeded the slow threshold
    UpSlow,
    /// Nothing determined the status (the HTTP probe never ran)
    Down,
    /// The server answered with an unexpected status code
    DownCode(u16),
    /// The HTTP request itself failed
    DownHttpError,
}

impl SiteStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, SiteStatus::Up | SiteStatus::UpSlow)
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteStatus::Up => write!(f, "Up"),
            SiteStatus::UpSlow => write!(f, "Up (Slow)"),
            SiteStatus::Down => write!(f, "Down"),
            SiteStatus::DownCode(code) => write!(f, "Down ({})", code),
            SiteStatus::DownHttpError => write!(f, "Down (HTTP Error)"),
        }
    }
}

impl Serialize for SiteStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of searching the response body for the site keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeywordCheck {
    Skipped,
    Pass,
    Fail,
    /// Body declared a charset that could not be decoded
    Error,
}

impl fmt::Display for KeywordCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            KeywordCheck::Skipped => "Skipped",
            KeywordCheck::Pass => "Pass",
            KeywordCheck::Fail => "Fail",
            KeywordCheck::Error => "Error",
        };
        f.write_str(text)
    }
}

/// Everything the HTTP probe learned about a site
#[derive(Debug, Clone, PartialEq)]
pub struct HttpOutcome {
    /// `Up`, `DownCode` or `DownHttpError`; slow escalation happens later
    pub status: SiteStatus,
    pub time_ms: Metric<f64>,
    pub content_kb: Metric<f64>,
    pub redirects: u32,
    pub keyword: KeywordCheck,
    /// Anomaly notes in the order they were found
    pub notes: Vec<String>,
    /// Set when the outcome should be forwarded to the alert sink
    pub alert: Option<AlertReason>,
}

impl HttpOutcome {
    pub fn request_failed(error: impl Into<String>) -> Self {
        Self {
            status: SiteStatus::DownHttpError,
            time_ms: Metric::Failed,
            content_kb: Metric::Failed,
            redirects: 0,
            keyword: KeywordCheck::Skipped,
            notes: vec![NOTE_HTTP_FAILED.to_string()],
            alert: Some(AlertReason::HttpFailure {
                error: error.into(),
            }),
        }
    }
}

/// Certificate expiry as seen over a TLS handshake
#[derive(Debug, Clone, PartialEq)]
pub struct TlsOutcome {
    pub days_left: Metric<i64>,
    pub expires_at: Metric<DateTime<Utc>>,
    pub note: Option<&'static str>,
}

impl TlsOutcome {
    pub fn from_expiry(not_after: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            days_left: Metric::Measured(days_until(not_after, now)),
            expires_at: Metric::Measured(not_after),
            note: None,
        }
    }

    /// Connect, handshake and parse failures all look the same in the record.
    pub fn failed() -> Self {
        Self {
            days_left: Metric::Failed,
            expires_at: Metric::Unavailable,
            note: Some(NOTE_SSL_FAILED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_status_display() {
        assert_eq!(SiteStatus::Up.to_string(), "Up");
        assert_eq!(SiteStatus::UpSlow.to_string(), "Up (Slow)");
        assert_eq!(SiteStatus::Down.to_string(), "Down");
        assert_eq!(SiteStatus::DownCode(503).to_string(), "Down (503)");
        assert_eq!(SiteStatus::DownHttpError.to_string(), "Down (HTTP Error)");
        assert!(SiteStatus::UpSlow.is_up());
        assert!(!SiteStatus::DownCode(200).is_up());
    }

    #[test]
    fn test_request_failed_uses_sentinels() {
        let outcome = HttpOutcome::request_failed("connection refused");
        assert_eq!(outcome.time_ms, Metric::Failed);
        assert_eq!(outcome.content_kb, Metric::Failed);
        assert_eq!(outcome.notes, vec!["HTTP request failed.".to_string()]);
        assert!(matches!(outcome.alert, Some(AlertReason::HttpFailure { .. })));
    }

    #[test]
    fn test_tls_outcome_from_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let outcome = TlsOutcome::from_expiry(now + Duration::days(10), now);
        assert_eq!(outcome.days_left, Metric::Measured(10));
        assert!(outcome.note.is_none());

        let expired = TlsOutcome::from_expiry(now - Duration::hours(1), now);
        assert_eq!(expired.days_left, Metric::Measured(-1));
    }

    #[test]
    fn test_tls_failure() {
        let outcome = TlsOutcome::failed();
        assert_eq!(outcome.days_left.render(), "Failed");
        assert_eq!(outcome.expires_at.render(), "N/A");
        assert_eq!(outcome.note, Some("SSL check failed."));
    }
}
