//! Shared fixtures: a local HTTP responder, a canned registry and a
//! recording alert sink.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitewatch_core::alert::DeliveryFuture;
use sitewatch_core::whois::LookupFuture;
use sitewatch_core::{
    Alert, AlertSink, DomainExpiryProbe, RegistryLookup, RegistryRecord, Settings, SiteChecker,
    SiteConfig, TlsProbe, WatchError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Canned reply for one path.
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    body: Vec<u8>,
    content_type: String,
    location: Option<String>,
    delay: Duration,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Self::status(200).body(body)
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_type: "text/html; charset=utf-8".to_string(),
            location: None,
            delay: Duration::ZERO,
        }
    }

    pub fn redirect(to: &str) -> Self {
        Self {
            location: Some(to.to_string()),
            ..Self::status(302)
        }
    }

    pub fn body(self, body: &str) -> Self {
        self.bytes(body.as_bytes())
    }

    pub fn bytes(mut self, body: &[u8]) -> Self {
        self.body = body.to_vec();
        self
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Minimal HTTP/1.1 server on 127.0.0.1. Unknown paths get 404.
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, Reply)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<HashMap<String, Reply>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, reply)| (path.to_string(), reply))
                .collect(),
        );

        let handle = tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let routes = routes.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &routes).await;
                });
            }
        });

        Self { addr, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut stream: TcpStream, routes: &HashMap<String, Reply>) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") && request.len() < 16 * 1024 {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    let request = String::from_utf8_lossy(&request);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let reply = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| Reply::status(404).body("not found"));

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let mut response = format!(
        "HTTP/1.1 {} Status\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reply.content_type,
        reply.body.len()
    );
    if let Some(location) = &reply.location {
        response.push_str(&format!("Location: {}\r\n", location));
    }
    response.push_str("\r\n");

    stream.write_all(response.as_bytes()).await?;
    stream.write_all(&reply.body).await?;
    stream.shutdown().await
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Registry answering every domain with the same expiration values.
pub struct CannedRegistry {
    candidates: Option<Vec<String>>,
    calls: AtomicUsize,
}

impl CannedRegistry {
    pub fn expiring(date: &str) -> Arc<Self> {
        Arc::new(Self {
            candidates: Some(vec![date.to_string()]),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            candidates: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RegistryLookup for CannedRegistry {
    fn lookup<'a>(&'a self, domain: &'a str) -> LookupFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.candidates {
                Some(candidates) => Ok(RegistryRecord {
                    domain: domain.to_string(),
                    server: "whois.test".to_string(),
                    expiration_candidates: candidates.clone(),
                }),
                None => Err(WatchError::WhoisError("connection refused".to_string())),
            }
        })
    }
}

/// Keeps every alert it is handed.
#[derive(Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingSink {
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn deliver<'a>(&'a self, alert: &'a Alert) -> DeliveryFuture<'a> {
        Box::pin(async move {
            self.alerts.lock().unwrap().push(alert.clone());
            Ok(())
        })
    }
}

/// Settings that keep every probe on the loopback interface.
pub fn local_settings() -> Settings {
    Settings {
        use_icmp_by_default: false,
        default_timeout: 5,
        ..Settings::default()
    }
}

pub fn site(name: &str, url: &str) -> SiteConfig {
    SiteConfig::new(name, url, &local_settings())
}

/// Checker whose TLS probe hits a closed local port and whose registry is
/// `registry`, or none at all.
pub async fn checker(
    settings: &Settings,
    registry: Option<Arc<dyn RegistryLookup>>,
) -> SiteChecker {
    let tls = TlsProbe::new()
        .with_port(closed_port().await)
        .with_timeout(Duration::from_secs(2));
    let domain = match registry {
        Some(registry) => DomainExpiryProbe::new(registry, Duration::from_secs(300)),
        None => DomainExpiryProbe::unavailable(),
    };
    SiteChecker::new(settings)
        .with_tls_probe(tls)
        .with_domain_probe(domain)
}
