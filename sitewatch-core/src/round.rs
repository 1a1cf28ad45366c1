//! One monitoring round over every enabled site.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::alert::{self, Alert, AlertSink};
use crate::check::{CheckResult, SiteChecker, SiteReport};
use crate::config::{MonitorConfig, SiteConfig};
use crate::output::CsvLog;

pub type ProgressCallback = Box<dyn Fn(usize, usize, &str) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub started_at: DateTime<Utc>,
    /// One record per checked site, in configuration order
    pub records: Vec<CheckResult>,
    /// Sites whose check died unexpectedly
    pub skipped: Vec<String>,
    pub alerts: usize,
    /// Rows written to the log; zero when there is no log or the write failed
    pub appended: usize,
    pub duration_ms: u64,
}

impl RoundSummary {
    fn empty(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            records: Vec::new(),
            skipped: Vec::new(),
            alerts: 0,
            appended: 0,
            duration_ms: 0,
        }
    }

    pub fn up_count(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_up()).count()
    }
}

/// Checks sites concurrently, then alerts and logs the results.
pub struct RoundRunner {
    checker: Arc<SiteChecker>,
    log: Option<Arc<CsvLog>>,
    sinks: Vec<Arc<dyn AlertSink>>,
    concurrency: usize,
}

impl RoundRunner {
    pub fn new(checker: SiteChecker) -> Self {
        Self {
            checker: Arc::new(checker),
            log: None,
            sinks: Vec::new(),
            concurrency: 8,
        }
    }

    /// Checker, log file and concurrency from `config`; no alert sinks.
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(SiteChecker::from_config(config))
            .with_log(CsvLog::new(&config.settings.log_file))
            .with_concurrency(config.settings.max_concurrency)
    }

    pub fn with_log(mut self, log: CsvLog) -> Self {
        self.log = Some(Arc::new(log));
        self
    }

    pub fn with_sinks(mut self, sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        self.sinks = sinks;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(&self, sites: &[SiteConfig], progress: Option<ProgressCallback>) -> RoundSummary {
        let started_at = Utc::now();
        let start = Instant::now();

        let enabled: Vec<SiteConfig> = sites
            .iter()
            .filter(|site| {
                if !site.enabled {
                    debug!(site = %site.name, "Skipping disabled site");
                }
                site.enabled
            })
            .cloned()
            .collect();

        if enabled.is_empty() {
            info!("No sites to check");
            return RoundSummary::empty(started_at);
        }

        let total = enabled.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        debug!(total = total, concurrency = self.concurrency, "Starting round");

        let mut outcomes: Vec<(usize, String, Option<SiteReport>)> = stream::iter(enabled.into_iter().enumerate())
            .map(|(index, site)| {
                let semaphore = semaphore.clone();
                let completed = completed.clone();
                let checker = self.checker.clone();
                let progress = progress.as_ref();

                async move {
                    let name = site.name.clone();
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            warn!(site = %name, "Round cancelled before site was checked");
                            return (index, name, None);
                        }
                    };

                    // Own task so a panic inside one site's probes stays there
                    let report = match tokio::spawn(async move { checker.check(&site).await }).await {
                        Ok(report) => report,
                        Err(e) => {
                            error!(site = %name, error = %e, "Unexpected error checking site");
                            None
                        }
                    };

                    let count = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(progress) = progress {
                        progress(count, total, &name);
                    }

                    (index, name, report)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut summary = RoundSummary::empty(started_at);
        let mut alerts: Vec<Alert> = Vec::new();
        for (_, name, report) in outcomes {
            match report {
                Some(report) => {
                    alerts.extend(report.alert);
                    summary.records.push(report.record);
                }
                None => summary.skipped.push(name),
            }
        }

        summary.alerts = alerts.len();
        alert::dispatch(&self.sinks, &alerts).await;

        if let Some(log) = &self.log {
            match log.append(&summary.records).await {
                Ok(written) => summary.appended = written,
                Err(e) => error!(path = %log.path().display(), error = %e, "Failed to write log file"),
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            checked = summary.records.len(),
            up = summary.up_count(),
            skipped = summary.skipped.len(),
            alerts = summary.alerts,
            duration_ms = summary.duration_ms,
            "Round complete"
        );
        summary
    }
}
