use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DNS resolution failed: {0}")]
    DnsError(String),

    #[error("ICMP ping failed: {0}")]
    PingError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("WHOIS lookup failed: {0}")]
    WhoisError(String),

    #[error("WHOIS server not found for TLD: {0}")]
    WhoisServerNotFound(String),

    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Timed out waiting for log lock {}", .0.display())]
    LockTimeout(PathBuf),

    #[error("Alert delivery failed: {0}")]
    AlertError(String),

    #[error("Failed after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: usize, last_error: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, WatchError>;
