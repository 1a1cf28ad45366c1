pub mod alert;
pub mod cache;
pub mod check;
pub mod colors;
pub mod config;
pub mod dns;
pub mod domain_expiry;
pub mod error;
pub mod metric;
pub mod output;
pub mod ping;
pub mod retry;
pub mod round;
pub mod status;
pub mod validation;
pub mod whois;

pub use error::{Result, WatchError};
pub use validation::{extract_hostname, normalize_domain, registrable_domain};

pub use alert::{Alert, AlertReason, AlertSink, EmailAlertSink, EmailConfig, TracingAlertSink};
pub use check::{CheckResult, SiteChecker, SiteReport};
pub use config::{MonitorConfig, Settings, SiteConfig};
pub use dns::DnsProbe;
pub use domain_expiry::DomainExpiryProbe;
pub use metric::Metric;
pub use ping::PingProbe;
pub use status::{HttpProbe, KeywordCheck, SiteStatus, TlsProbe};
pub use whois::{RegistryLookup, RegistryRecord, WhoisClient};

pub use output::{CsvLog, OutputFormat, OutputFormatter};
pub use round::{ProgressCallback, RoundRunner, RoundSummary};
