//! ICMP reachability probe.

use std::net::IpAddr;
use std::time::Duration;

use surge_ping::{Client, Config, PingIdentifier, PingSequence, SurgeError, ICMP};
use tracing::{debug, instrument};

use crate::error::{Result, WatchError};
use crate::metric::{round2, Metric};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
const PAYLOAD: [u8; 56] = [0; 56];

pub const NOTE_PING_FAILED: &str = "ICMP ping failed.";

#[derive(Debug, Clone, PartialEq)]
pub struct PingOutcome {
    /// Round-trip time; `Unavailable` when skipped, `Failed` on no reply,
    /// `Error` when the ping transport itself broke
    pub rtt_ms: Metric<f64>,
    pub note: Option<&'static str>,
}

impl PingOutcome {
    pub fn skipped() -> Self {
        Self {
            rtt_ms: Metric::Unavailable,
            note: None,
        }
    }

    pub fn replied(rtt_ms: f64) -> Self {
        Self {
            rtt_ms: Metric::Measured(round2(rtt_ms)),
            note: None,
        }
    }

    pub fn no_reply() -> Self {
        Self {
            rtt_ms: Metric::Failed,
            note: None,
        }
    }

    pub fn transport_error() -> Self {
        Self {
            rtt_ms: Metric::Error,
            note: Some(NOTE_PING_FAILED),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PingProbe {
    timeout: Duration,
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl PingProbe {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send one echo request to `address`.
    ///
    /// Skipped (N/A) unless ICMP is enabled for the site *and* DNS produced
    /// an address; an empty target is never pinged.
    #[instrument(skip(self))]
    pub async fn probe(&self, enabled: bool, address: Option<IpAddr>) -> PingOutcome {
        let address = match (enabled, address) {
            (true, Some(address)) => address,
            _ => return PingOutcome::skipped(),
        };

        match self.echo(address).await {
            Ok(Some(rtt)) => PingOutcome::replied(rtt.as_secs_f64() * 1000.0),
            Ok(None) => PingOutcome::no_reply(),
            Err(e) => {
                debug!(error = %e, "ICMP transport error");
                PingOutcome::transport_error()
            }
        }
    }

    /// `Ok(None)` means the target stayed silent for the whole timeout.
    async fn echo(&self, address: IpAddr) -> Result<Option<Duration>> {
        let config = match address {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        let client =
            Client::new(&config).map_err(|e| WatchError::PingError(format!("socket: {}", e)))?;

        let mut pinger = client.pinger(address, PingIdentifier(rand::random())).await;
        pinger.timeout(self.timeout);

        match pinger.ping(PingSequence(0), &PAYLOAD).await {
            Ok((_, rtt)) => Ok(Some(rtt)),
            Err(SurgeError::Timeout { .. }) => Ok(None),
            Err(e) => Err(WatchError::PingError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_disabled_is_not_available() {
        let outcome = PingProbe::new()
            .probe(false, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)))
            .await;
        assert_eq!(outcome, PingOutcome::skipped());
        assert_eq!(outcome.rtt_ms.render(), "N/A");
    }

    #[tokio::test]
    async fn test_missing_address_is_skipped_even_when_enabled() {
        let outcome = PingProbe::new().probe(true, None).await;
        assert_eq!(outcome.rtt_ms, Metric::Unavailable);
        assert!(outcome.note.is_none());
    }

    #[tokio::test]
    async fn test_loopback_never_reports_a_bare_zero() {
        // Unprivileged runners may lack ICMP sockets; every outcome is a
        // distinct variant either way.
        let outcome = PingProbe::new()
            .with_timeout(Duration::from_millis(500))
            .probe(true, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)))
            .await;
        match outcome.rtt_ms {
            Metric::Measured(rtt) => assert!(rtt >= 0.0),
            Metric::Failed => assert!(outcome.note.is_none()),
            Metric::Error => assert_eq!(outcome.note, Some(NOTE_PING_FAILED)),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_outcome_rendering() {
        assert_eq!(PingOutcome::no_reply().rtt_ms.render(), "Failed");
        assert_eq!(PingOutcome::transport_error().rtt_ms.render(), "Error");
        assert_eq!(PingOutcome::replied(12.345).rtt_ms.render(), "12.35");
    }
}
