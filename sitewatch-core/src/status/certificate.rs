use std::time::Duration;

use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use super::types::TlsOutcome;
use crate::error::{Result, WatchError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTPS_PORT: u16 = 443;

/// Reads the leaf certificate's expiry over a verified TLS handshake.
#[derive(Debug, Clone)]
pub struct TlsProbe {
    timeout: Duration,
    port: u16,
}

impl Default for TlsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsProbe {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            port: HTTPS_PORT,
        }
    }

    /// Timeout applied separately to the TCP connect and the handshake
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[instrument(skip(self), fields(hostname = %hostname, port = self.port))]
    pub async fn probe(&self, hostname: &str) -> TlsOutcome {
        match self.fetch_not_after(hostname).await {
            Ok(not_after) => {
                debug!(%not_after, "Certificate expiry read");
                TlsOutcome::from_expiry(not_after, Utc::now())
            }
            Err(e) => {
                debug!(error = %e, "TLS check failed");
                TlsOutcome::failed()
            }
        }
    }

    async fn fetch_not_after(&self, hostname: &str) -> Result<DateTime<Utc>> {
        if hostname.is_empty() {
            return Err(WatchError::CertificateError("empty hostname".to_string()));
        }

        // Default verification: an untrusted or mismatched chain is a failure
        let connector = TlsConnector::builder()
            .build()
            .map_err(|e| WatchError::CertificateError(e.to_string()))?;
        let connector = tokio_native_tls::TlsConnector::from(connector);

        let stream = tokio::time::timeout(self.timeout, TcpStream::connect((hostname, self.port)))
            .await
            .map_err(|_| WatchError::Timeout(format!("Connection to {} timed out", hostname)))?
            .map_err(|e| WatchError::CertificateError(e.to_string()))?;

        let tls_stream = tokio::time::timeout(self.timeout, connector.connect(hostname, stream))
            .await
            .map_err(|_| WatchError::Timeout(format!("TLS handshake with {} timed out", hostname)))?
            .map_err(|e| WatchError::CertificateError(e.to_string()))?;

        let cert = tls_stream
            .get_ref()
            .peer_certificate()
            .map_err(|e| WatchError::CertificateError(e.to_string()))?
            .ok_or_else(|| WatchError::CertificateError("No certificate presented".to_string()))?;

        let der = cert
            .to_der()
            .map_err(|e| WatchError::CertificateError(e.to_string()))?;

        not_after_from_der(&der)
    }
}

/// Expiry instant of a DER-encoded X.509 certificate
pub fn not_after_from_der(der: &[u8]) -> Result<DateTime<Utc>> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| WatchError::CertificateError(format!("invalid certificate: {}", e)))?;

    let timestamp = cert.validity().not_after.timestamp();
    DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| {
        WatchError::CertificateError(format!("notAfter out of range: {}", timestamp))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;

    #[test]
    fn test_garbage_der_is_rejected() {
        assert!(not_after_from_der(b"definitely not a certificate").is_err());
        assert!(not_after_from_der(&[]).is_err());
    }

    #[tokio::test]
    async fn test_empty_hostname_fails() {
        let outcome = TlsProbe::new().probe("").await;
        assert_eq!(outcome, TlsOutcome::failed());
    }

    #[tokio::test]
    async fn test_closed_port_fails() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let outcome = TlsProbe::new()
            .with_port(port)
            .with_timeout(Duration::from_secs(2))
            .probe("127.0.0.1")
            .await;
        assert_eq!(outcome.days_left, Metric::Failed);
        assert_eq!(outcome.note, Some("SSL check failed."));
    }

    #[tokio::test]
    async fn test_plaintext_server_fails_handshake() {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await;
            }
        });

        let outcome = TlsProbe::new()
            .with_port(port)
            .with_timeout(Duration::from_secs(2))
            .probe("localhost")
            .await;
        assert_eq!(outcome, TlsOutcome::failed());
    }
}
