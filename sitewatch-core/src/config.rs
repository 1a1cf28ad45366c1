//! Monitor configuration.
//!
//! A TOML file supplies global `[settings]` and a `[[sites]]` list; selected
//! environment variables override the file. Optional site fields fall back to
//! the global defaults when the file is resolved, so the rest of the crate
//! only ever sees fully populated [`SiteConfig`] values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WatchError};

mod defaults {
    use std::path::PathBuf;

    pub fn monitor_interval() -> u64 { 1800 }
    pub fn default_timeout() -> u64 { 10 }
    pub fn use_icmp_by_default() -> bool { true }
    pub fn response_time_threshold() -> f64 { 3000.0 }
    pub fn ssl_alert_days() -> i64 { 30 }
    pub fn max_concurrency() -> usize { 8 }
    pub fn whois_enabled() -> bool { true }
    pub fn whois_cache_ttl() -> u64 { 6 * 3600 }
    pub fn log_file() -> PathBuf { "website_monitor_log.csv".into() }
    pub fn enabled() -> bool { true }
    pub fn expected_status() -> u16 { 200 }
}

/// Global settings shared by every site in a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds between rounds in interval mode
    #[serde(default = "defaults::monitor_interval")]
    pub monitor_interval: u64,
    /// Per-site HTTP timeout in seconds when the site sets none
    #[serde(default = "defaults::default_timeout")]
    pub default_timeout: u64,
    #[serde(default = "defaults::use_icmp_by_default")]
    pub use_icmp_by_default: bool,
    /// HTTP time in milliseconds above which an up site is reported slow
    #[serde(default = "defaults::response_time_threshold")]
    pub response_time_threshold: f64,
    /// Certificate/registration horizon, in days, that output layers flag
    #[serde(default = "defaults::ssl_alert_days")]
    pub ssl_alert_days: i64,
    #[serde(default = "defaults::max_concurrency")]
    pub max_concurrency: usize,
    /// Set to false when no registry lookups may be made from this host
    #[serde(default = "defaults::whois_enabled")]
    pub whois_enabled: bool,
    /// Seconds a successful registry answer is reused
    #[serde(default = "defaults::whois_cache_ttl")]
    pub whois_cache_ttl: u64,
    /// Resolver to query instead of the system configuration
    #[serde(default)]
    pub nameserver: Option<String>,
    #[serde(default = "defaults::log_file")]
    pub log_file: PathBuf,
    /// Daily run times ("HH:MM", local time); empty means interval mode
    #[serde(default)]
    pub scheduled_times: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monitor_interval: defaults::monitor_interval(),
            default_timeout: defaults::default_timeout(),
            use_icmp_by_default: defaults::use_icmp_by_default(),
            response_time_threshold: defaults::response_time_threshold(),
            ssl_alert_days: defaults::ssl_alert_days(),
            max_concurrency: defaults::max_concurrency(),
            whois_enabled: defaults::whois_enabled(),
            whois_cache_ttl: defaults::whois_cache_ttl(),
            nameserver: None,
            log_file: defaults::log_file(),
            scheduled_times: Vec::new(),
        }
    }
}

impl Settings {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval)
    }

    pub fn whois_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.whois_cache_ttl)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MONITOR_INTERVAL") {
            self.monitor_interval = parse_env("MONITOR_INTERVAL", &v)?;
        }
        if let Some(v) = lookup("DEFAULT_TIMEOUT") {
            self.default_timeout = parse_env("DEFAULT_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("USE_ICMP_BY_DEFAULT") {
            self.use_icmp_by_default = parse_flag(&v);
        }
        if let Some(v) = lookup("RESPONSE_TIME_THRESHOLD") {
            self.response_time_threshold = parse_env("RESPONSE_TIME_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("SSL_ALERT_DAYS") {
            self.ssl_alert_days = parse_env("SSL_ALERT_DAYS", &v)?;
        }
        if let Some(v) = lookup("LOG_FILE") {
            if !v.trim().is_empty() {
                self.log_file = PathBuf::from(v.trim());
            }
        }
        if let Some(v) = lookup("SCHEDULED_TIMES") {
            self.scheduled_times = v
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.default_timeout == 0 {
            return Err(WatchError::Config("default_timeout must be greater than zero".into()));
        }
        if !self.response_time_threshold.is_finite() || self.response_time_threshold < 0.0 {
            return Err(WatchError::Config(
                "response_time_threshold must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

/// A site entry as written in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub use_icmp: Option<bool>,
    #[serde(default)]
    pub expected_status: Option<u16>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub check_keyword: Option<bool>,
}

/// Immutable per-site input to a check.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub timeout: Duration,
    pub use_icmp: bool,
    pub expected_status: u16,
    pub keyword: Option<String>,
    pub check_keyword: bool,
}

impl SiteConfig {
    /// A site with every optional field taken from `settings`.
    pub fn new(name: impl Into<String>, url: impl Into<String>, settings: &Settings) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            enabled: true,
            timeout: Duration::from_secs(settings.default_timeout),
            use_icmp: settings.use_icmp_by_default,
            expected_status: defaults::expected_status(),
            keyword: None,
            check_keyword: false,
        }
    }

    fn resolve(entry: SiteEntry, settings: &Settings) -> Result<Self> {
        if entry.url.trim().is_empty() {
            return Err(WatchError::Config(format!(
                "site '{}' has no url",
                entry.name
            )));
        }
        let timeout = entry.timeout.unwrap_or(settings.default_timeout);
        if timeout == 0 {
            return Err(WatchError::Config(format!(
                "site '{}' has a zero timeout",
                entry.name
            )));
        }

        let keyword = entry.keyword.filter(|k| !k.is_empty());
        let check_keyword = entry.check_keyword.unwrap_or(keyword.is_some());

        Ok(Self {
            name: entry.name,
            url: entry.url.trim().to_string(),
            enabled: entry.enabled,
            timeout: Duration::from_secs(timeout),
            use_icmp: entry.use_icmp.unwrap_or(settings.use_icmp_by_default),
            expected_status: entry.expected_status.unwrap_or(defaults::expected_status()),
            keyword,
            check_keyword,
        })
    }

    /// The keyword to search for, when searching is switched on.
    pub fn active_keyword(&self) -> Option<&str> {
        if self.check_keyword {
            self.keyword.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    sites: Vec<SiteEntry>,
}

/// Fully resolved configuration for one process.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub settings: Settings,
    pub sites: Vec<SiteConfig>,
}

impl MonitorConfig {
    /// Load from a TOML file and apply the process environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            WatchError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Self::from_toml_with_env(&contents, |key| std::env::var(key).ok())
    }

    /// Parse TOML without consulting the environment.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Self::from_toml_with_env(contents, |_| None)
    }

    pub fn from_toml_with_env<F>(contents: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ConfigFile = toml::from_str(contents)?;

        let mut settings = file.settings;
        settings.apply_env(lookup)?;
        settings.validate()?;
        settings.max_concurrency = settings.max_concurrency.max(1);

        let sites = file
            .sites
            .into_iter()
            .map(|entry| SiteConfig::resolve(entry, &settings))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { settings, sites })
    }

    pub fn enabled_sites(&self) -> impl Iterator<Item = &SiteConfig> {
        self.sites.iter().filter(|site| site.enabled)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| WatchError::Config(format!("invalid value for {}: {:?}", key, value)))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[settings]
default_timeout = 15
use_icmp_by_default = false
response_time_threshold = 2500

[[sites]]
name = "Portal"
url = "https://portal.example.com"
keyword = "Welcome"

[[sites]]
name = "API"
url = "https://api.example.com/health"
timeout = 5
use_icmp = true
expected_status = 204
keyword = "ok"
check_keyword = false

[[sites]]
name = "Retired"
url = "https://old.example.com"
enabled = false
"#;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = MonitorConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.sites.len(), 3);

        let portal = &config.sites[0];
        assert_eq!(portal.timeout, Duration::from_secs(15));
        assert!(!portal.use_icmp);
        assert_eq!(portal.expected_status, 200);
        assert!(portal.check_keyword, "keyword presence turns checking on");
        assert_eq!(portal.active_keyword(), Some("Welcome"));

        let api = &config.sites[1];
        assert_eq!(api.timeout, Duration::from_secs(5));
        assert!(api.use_icmp);
        assert_eq!(api.expected_status, 204);
        assert_eq!(api.active_keyword(), None);

        assert_eq!(config.settings.response_time_threshold, 2500.0);
        assert_eq!(config.settings.monitor_interval, 1800);
        assert_eq!(config.settings.ssl_alert_days, 30);
    }

    #[test]
    fn test_enabled_sites_skips_disabled() {
        let config = MonitorConfig::from_toml_str(SAMPLE).unwrap();
        let names: Vec<_> = config.enabled_sites().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Portal", "API"]);
    }

    #[test]
    fn test_empty_file_is_valid() {
        let config = MonitorConfig::from_toml_str("").unwrap();
        assert!(config.sites.is_empty());
        assert_eq!(config.settings.default_timeout, 10);
        assert!(config.settings.use_icmp_by_default);
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("DEFAULT_TIMEOUT", "3"),
            ("USE_ICMP_BY_DEFAULT", "yes"),
            ("RESPONSE_TIME_THRESHOLD", "1200.5"),
            ("SCHEDULED_TIMES", "08:00, 20:30,"),
            ("LOG_FILE", "/var/log/sites.csv"),
        ]
        .into_iter()
        .collect();

        let config =
            MonitorConfig::from_toml_with_env(SAMPLE, |k| env.get(k).map(|v| v.to_string()))
                .unwrap();

        assert_eq!(config.sites[0].timeout, Duration::from_secs(3));
        assert!(config.sites[0].use_icmp);
        assert_eq!(config.settings.response_time_threshold, 1200.5);
        assert_eq!(config.settings.scheduled_times, vec!["08:00", "20:30"]);
        assert_eq!(config.settings.log_file, PathBuf::from("/var/log/sites.csv"));
    }

    #[test]
    fn test_invalid_env_value_is_reported() {
        let result = MonitorConfig::from_toml_with_env(SAMPLE, |k| {
            (k == "MONITOR_INTERVAL").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(WatchError::Config(_))));
    }

    #[test]
    fn test_site_without_url_is_rejected() {
        let result = MonitorConfig::from_toml_str("[[sites]]\nname = \"blank\"\n");
        assert!(matches!(result, Err(WatchError::Config(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = MonitorConfig::from_toml_str("[[sites]\nurl=");
        assert!(matches!(result, Err(WatchError::ConfigParse(_))));
    }
}
