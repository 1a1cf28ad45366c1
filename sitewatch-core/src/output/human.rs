use std::fmt::Display;

use chrono::{DateTime, Utc};
use colored::Colorize;

use super::OutputFormatter;
use crate::check::CheckResult;
use crate::colors::CatppuccinExt;
use crate::metric::{Metric, Render};
use crate::round::RoundSummary;
use crate::status::{KeywordCheck, SiteStatus};

const DEFAULT_ALERT_DAYS: i64 = 30;

fn format_duration(duration_ms: u64) -> String {
    let total_secs = duration_ms / 1000;
    if total_secs == 0 {
        format!("{}ms", duration_ms)
    } else if total_secs < 60 {
        format!("{:.1}s", duration_ms as f64 / 1000.0)
    } else {
        format!("{}m {}s", total_secs / 60, total_secs % 60)
    }
}

pub struct HumanFormatter {
    use_colors: bool,
    alert_days: i64,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            alert_days: DEFAULT_ALERT_DAYS,
        }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Flag certificates and registrations expiring within `days`.
    pub fn with_alert_days(mut self, days: i64) -> Self {
        self.alert_days = days;
        self
    }

    fn label(&self, text: &str) -> String {
        if self.use_colors {
            text.sky().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn value(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_white().to_string()
        } else {
            text.to_string()
        }
    }

    fn muted(&self, text: &str) -> String {
        if self.use_colors {
            text.overlay0().to_string()
        } else {
            text.to_string()
        }
    }

    fn success(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_green().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_yellow().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn error(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        let width = text.chars().count();
        if self.use_colors {
            format!("\n{}\n{}", text.lavender().bold(), "─".repeat(width).overlay0())
        } else {
            format!("\n{}\n{}", text, "-".repeat(width))
        }
    }

    fn status(&self, status: SiteStatus) -> String {
        let text = status.to_string();
        match status {
            SiteStatus::Up => self.success(&text),
            SiteStatus::UpSlow => self.warning(&text),
            _ => self.error(&text),
        }
    }

    /// Measurements plain, N/A muted, every failure sentinel red.
    fn metric<T: Render>(&self, metric: &Metric<T>, unit: &str) -> String {
        match metric {
            Metric::Measured(value) => self.value(&format!("{}{}", value.render(), unit)),
            Metric::Unavailable => self.muted(&metric.render()),
            _ => self.error(&metric.render()),
        }
    }

    fn keyword(&self, check: KeywordCheck) -> String {
        let text = check.to_string();
        match check {
            KeywordCheck::Pass => self.success(&text),
            KeywordCheck::Skipped => self.muted(&text),
            KeywordCheck::Fail | KeywordCheck::Error => self.error(&text),
        }
    }

    fn expiry(&self, days: &Metric<i64>, at: &Metric<DateTime<Utc>>) -> String {
        match (days, at) {
            (Metric::Measured(days), Metric::Measured(at)) => {
                let text = format!("{} ({} days)", at.format("%Y-%m-%d"), days);
                if *days < 0 {
                    self.error(&format!("{} EXPIRED", text))
                } else if *days <= self.alert_days {
                    self.warning(&format!("{}!", text))
                } else {
                    self.value(&text)
                }
            }
            (days, _) => self.metric(days, ""),
        }
    }

    fn line(&self, output: &mut Vec<String>, label: &str, value: impl Display) {
        output.push(format!("  {}: {}", self.label(label), value));
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_record(&self, record: &CheckResult) -> String {
        let mut output = Vec::new();

        output.push(self.header(&format!("{} ({})", record.name, record.url)));

        self.line(&mut output, "Status", self.status(record.status));
        self.line(&mut output, "Checked", self.muted(&record.checked_at.to_rfc3339()));
        self.line(&mut output, "DNS", self.metric(&record.dns_ms, " ms"));
        self.line(&mut output, "Ping", self.metric(&record.ping_ms, " ms"));
        self.line(&mut output, "HTTP", self.metric(&record.http_ms, " ms"));
        self.line(&mut output, "Content", self.metric(&record.content_kb, " KB"));
        self.line(&mut output, "Redirects", self.value(&record.redirects.to_string()));
        self.line(&mut output, "Keyword", self.keyword(record.keyword));
        self.line(
            &mut output,
            "SSL Expiry",
            self.expiry(&record.ssl_days_left, &record.ssl_expires_at),
        );
        self.line(
            &mut output,
            "Domain Expiry",
            self.expiry(&record.domain_days_left, &record.domain_expires_at),
        );

        if !record.notes.is_empty() {
            self.line(&mut output, "Notes", self.warning(&record.notes));
        }

        output.join("\n")
    }

    fn format_round(&self, summary: &RoundSummary) -> String {
        let mut output: Vec<String> = summary
            .records
            .iter()
            .map(|record| self.format_record(record))
            .collect();

        output.push(self.header(&format!(
            "Round {}",
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )));

        let checked = summary.records.len();
        let up = summary.up_count();
        let up_text = format!("{}/{}", up, checked);
        self.line(
            &mut output,
            "Up",
            if up == checked {
                self.success(&up_text)
            } else {
                self.error(&up_text)
            },
        );

        let expiring: Vec<&str> = summary
            .records
            .iter()
            .filter(|r| {
                r.ssl_expiring_within(self.alert_days) || r.domain_expiring_within(self.alert_days)
            })
            .map(|r| r.name.as_str())
            .collect();
        if !expiring.is_empty() {
            self.line(&mut output, "Expiring", self.warning(&expiring.join(", ")));
        }

        if !summary.skipped.is_empty() {
            self.line(&mut output, "Skipped", self.error(&summary.skipped.join(", ")));
        }
        if summary.alerts > 0 {
            self.line(&mut output, "Alerts", self.error(&summary.alerts.to_string()));
        }
        self.line(&mut output, "Logged", self.value(&format!("{} rows", summary.appended)));
        self.line(&mut output, "Duration", self.muted(&format_duration(summary.duration_ms)));

        output.join("\n")
    }
}
