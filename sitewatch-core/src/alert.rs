//! Down alerts and where they are delivered.
//!
//! The checker only decides *that* a site deserves an alert (an unexpected
//! status code or a failed HTTP request). Sinks decide how it is delivered;
//! a sink failing never affects the round.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, WatchError};

const DEFAULT_SMTP_PORT: u16 = 587;
const IMPLICIT_TLS_PORT: u16 = 465;

/// Why a site was considered down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertReason {
    StatusMismatch { expected: u16, actual: u16 },
    HttpFailure { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub site: String,
    pub url: String,
    pub subject: String,
    pub body: String,
    pub reason: AlertReason,
}

impl Alert {
    pub fn new(site: &str, url: &str, reason: AlertReason, at: DateTime<Utc>) -> Self {
        let when = at.format("%Y-%m-%d %H:%M:%S UTC");
        let body = match &reason {
            AlertReason::StatusMismatch { actual, .. } => format!(
                "The website '{}' ({}) returned a status code of {} at {}.",
                site, url, actual, when
            ),
            AlertReason::HttpFailure { error } => format!(
                "The website '{}' ({}) could not be reached at {} due to an HTTP error: {}",
                site, url, when, error
            ),
        };

        Self {
            site: site.to_string(),
            url: url.to_string(),
            subject: format!("Alert: Website '{}' is Down", site),
            body,
            reason,
        }
    }
}

pub type DeliveryFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Destination for alerts.
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn deliver<'a>(&'a self, alert: &'a Alert) -> DeliveryFuture<'a>;
}

/// Writes alerts to the log at `warn`.
#[derive(Debug, Clone, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn deliver<'a>(&'a self, alert: &'a Alert) -> DeliveryFuture<'a> {
        Box::pin(async move {
            warn!(site = %alert.site, url = %alert.url, subject = %alert.subject, "{}", alert.body);
            Ok(())
        })
    }
}

/// SMTP settings for [`EmailAlertSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
}

impl EmailConfig {
    /// Read `EMAIL_*` variables from the process environment.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `None` unless `EMAIL_ENABLED` is truthy and host, credentials and at
    /// least one recipient are present.
    ///
    /// | Variable        | Default        |
    /// |-----------------|----------------|
    /// | `EMAIL_ENABLED` | `false`        |
    /// | `EMAIL_SMTP`    | required       |
    /// | `EMAIL_PORT`    | `587`          |
    /// | `EMAIL_USER`    | required       |
    /// | `EMAIL_PASS`    | required       |
    /// | `EMAIL_FROM`    | `EMAIL_USER`   |
    /// | `EMAIL_TO`      | required, comma separated |
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup("EMAIL_ENABLED")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);
        if !enabled {
            return None;
        }

        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let smtp_host = non_empty("EMAIL_SMTP")?;
        let username = non_empty("EMAIL_USER")?;
        let password = non_empty("EMAIL_PASS")?;
        let to: Vec<String> = non_empty("EMAIL_TO")?
            .split(',')
            .map(|addr| addr.trim().to_string())
            .filter(|addr| !addr.is_empty())
            .collect();
        if to.is_empty() {
            return None;
        }

        Some(Self {
            smtp_port: non_empty("EMAIL_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from: non_empty("EMAIL_FROM").unwrap_or_else(|| username.clone()),
            smtp_host,
            username,
            password,
            to,
        })
    }
}

/// Sends alerts as plain-text email.
pub struct EmailAlertSink {
    from: Mailbox,
    to: Vec<Mailbox>,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailAlertSink {
    /// Port 465 uses implicit TLS; any other port upgrades with STARTTLS.
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from = parse_mailbox(&config.from)?;
        let to = config
            .to
            .iter()
            .map(|addr| parse_mailbox(addr))
            .collect::<Result<Vec<_>>>()?;

        let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        }
        .map_err(|e| WatchError::AlertError(format!("SMTP setup failed: {}", e)))?;

        let mailer = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { from, to, mailer })
    }

    fn build_message(&self, alert: &Alert) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(alert.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        builder
            .body(alert.body.clone())
            .map_err(|e| WatchError::AlertError(format!("Email build error: {}", e)))
    }
}

impl AlertSink for EmailAlertSink {
    fn name(&self) -> &'static str {
        "email"
    }

    fn deliver<'a>(&'a self, alert: &'a Alert) -> DeliveryFuture<'a> {
        Box::pin(async move {
            let message = self.build_message(alert)?;
            self.mailer
                .send(message)
                .await
                .map_err(|e| WatchError::AlertError(format!("SMTP send failed: {}", e)))?;
            info!(site = %alert.site, recipients = self.to.len(), "Alert email sent");
            Ok(())
        })
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox> {
    addr.parse()
        .map_err(|e| WatchError::AlertError(format!("invalid address '{}': {}", addr, e)))
}

/// The log sink, plus email when `EMAIL_*` is fully configured.
pub fn sinks_from_env() -> Vec<Arc<dyn AlertSink>> {
    let mut sinks: Vec<Arc<dyn AlertSink>> = vec![Arc::new(TracingAlertSink)];
    match EmailConfig::from_env() {
        Some(config) => match EmailAlertSink::new(&config) {
            Ok(sink) => sinks.push(Arc::new(sink)),
            Err(e) => warn!(error = %e, "Email alerts disabled"),
        },
        None => info!("Email alerts are not enabled or configured"),
    }
    sinks
}

/// Deliver every alert to every sink; failures are logged and dropped.
pub async fn dispatch(sinks: &[Arc<dyn AlertSink>], alerts: &[Alert]) {
    for alert in alerts {
        for sink in sinks {
            if let Err(e) = sink.deliver(alert).await {
                warn!(sink = sink.name(), site = %alert.site, error = %e, "Alert delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
    }

    #[test]
    fn test_status_mismatch_alert_text() {
        let alert = Alert::new(
            "Portal",
            "https://portal.example",
            AlertReason::StatusMismatch {
                expected: 200,
                actual: 503,
            },
            at(),
        );
        assert_eq!(alert.subject, "Alert: Website 'Portal' is Down");
        assert_eq!(
            alert.body,
            "The website 'Portal' (https://portal.example) returned a status code of 503 at 2026-03-04 05:06:07 UTC."
        );
    }

    #[test]
    fn test_http_failure_alert_text() {
        let alert = Alert::new(
            "Portal",
            "https://portal.example",
            AlertReason::HttpFailure {
                error: "connection refused".to_string(),
            },
            at(),
        );
        assert!(alert.body.starts_with("The website 'Portal' (https://portal.example) could not be reached at"));
        assert!(alert.body.ends_with("due to an HTTP error: connection refused"));
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_email_config_requires_enabled_and_credentials() {
        assert!(EmailConfig::from_lookup(lookup_from(&[])).is_none());
        assert!(EmailConfig::from_lookup(lookup_from(&[
            ("EMAIL_ENABLED", "true"),
            ("EMAIL_SMTP", "smtp.example.org"),
            ("EMAIL_USER", "ops@example.org"),
            ("EMAIL_TO", "oncall@example.org"),
        ]))
        .is_none());
    }

    #[test]
    fn test_email_config_defaults() {
        let config = EmailConfig::from_lookup(lookup_from(&[
            ("EMAIL_ENABLED", "yes"),
            ("EMAIL_SMTP", "smtp.example.org"),
            ("EMAIL_USER", "ops@example.org"),
            ("EMAIL_PASS", "secret"),
            ("EMAIL_TO", "a@example.org, b@example.org,"),
        ]))
        .unwrap();
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.from, "ops@example.org");
        assert_eq!(config.to, vec!["a@example.org", "b@example.org"]);
    }

    #[test]
    fn test_email_sink_rejects_bad_address() {
        let config = EmailConfig {
            smtp_host: "smtp.example.org".to_string(),
            smtp_port: 587,
            username: "ops".to_string(),
            password: "secret".to_string(),
            from: "not an address".to_string(),
            to: vec!["oncall@example.org".to_string()],
        };
        assert!(matches!(
            EmailAlertSink::new(&config),
            Err(WatchError::AlertError(_))
        ));
    }

    #[tokio::test]
    async fn test_tracing_sink_always_succeeds() {
        let alert = Alert::new(
            "Portal",
            "https://portal.example",
            AlertReason::HttpFailure {
                error: "timeout".to_string(),
            },
            at(),
        );
        assert!(TracingAlertSink.deliver(&alert).await.is_ok());
    }
}
