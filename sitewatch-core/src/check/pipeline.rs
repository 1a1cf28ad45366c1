use std::net::IpAddr;

use chrono::Utc;
use tracing::{debug, error, instrument};

use super::composer::{compose, ProbeOutputs, SiteReport};
use crate::config::{MonitorConfig, Settings, SiteConfig};
use crate::dns::DnsProbe;
use crate::domain_expiry::DomainExpiryProbe;
use crate::ping::PingProbe;
use crate::status::{HttpProbe, TlsProbe};
use crate::validation::extract_hostname;

/// Runs the five probes for a site, in order, and composes the record.
pub struct SiteChecker {
    dns: DnsProbe,
    ping: PingProbe,
    http: HttpProbe,
    tls: TlsProbe,
    domain: DomainExpiryProbe,
    slow_threshold_ms: f64,
}

impl SiteChecker {
    pub fn new(settings: &Settings) -> Self {
        Self {
            dns: DnsProbe::new().with_nameserver(settings.nameserver.clone()),
            ping: PingProbe::new(),
            http: HttpProbe::new(),
            tls: TlsProbe::new(),
            domain: DomainExpiryProbe::from_settings(settings),
            slow_threshold_ms: settings.response_time_threshold,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(&config.settings)
    }

    pub fn with_dns_probe(mut self, probe: DnsProbe) -> Self {
        self.dns = probe;
        self
    }

    pub fn with_ping_probe(mut self, probe: PingProbe) -> Self {
        self.ping = probe;
        self
    }

    pub fn with_tls_probe(mut self, probe: TlsProbe) -> Self {
        self.tls = probe;
        self
    }

    pub fn with_domain_probe(mut self, probe: DomainExpiryProbe) -> Self {
        self.domain = probe;
        self
    }

    /// Check one site. Disabled sites produce no report.
    #[instrument(skip(self, site), fields(site = %site.name))]
    pub async fn check(&self, site: &SiteConfig) -> Option<SiteReport> {
        if !site.enabled {
            debug!("Skipping disabled site");
            return None;
        }

        let checked_at = Utc::now();
        let hostname = extract_hostname(&site.url);

        let dns = self.dns.probe(&hostname).await;
        let ping = self
            .ping
            .probe(site.use_icmp, dns.address.map(IpAddr::V4))
            .await;

        let http = match self.http.probe(site).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(error = %e, "HTTP probe could not run");
                None
            }
        };

        let tls = self.tls.probe(&hostname).await;
        let domain = self.domain.probe(&hostname).await;

        let report = compose(
            site,
            checked_at,
            self.slow_threshold_ms,
            ProbeOutputs {
                dns,
                ping,
                http,
                tls,
                domain,
            },
        );
        debug!(status = %report.record.status, notes = %report.record.notes, "Site checked");
        Some(report)
    }
}
