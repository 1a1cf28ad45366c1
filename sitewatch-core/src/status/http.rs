use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use super::types::{HttpOutcome, KeywordCheck, SiteStatus};
use crate::alert::AlertReason;
use crate::config::SiteConfig;
use crate::error::Result;
use crate::metric::{round2, Metric};

/// Redirect hops followed before the request is abandoned
const MAX_REDIRECTS: usize = 30;
const USER_AGENT: &str = concat!("sitewatch/", env!("CARGO_PKG_VERSION"));

/// Issues the site GET and derives Up / Down from the status code.
#[derive(Debug, Clone, Default)]
pub struct HttpProbe;

impl HttpProbe {
    pub fn new() -> Self {
        Self
    }

    /// Fetch `site.url`, following redirects.
    ///
    /// Request failures are part of the outcome; `Err` is reserved for
    /// failing to build an HTTP client at all.
    #[instrument(skip(self, site), fields(site = %site.name, url = %site.url))]
    pub async fn probe(&self, site: &SiteConfig) -> Result<HttpOutcome> {
        let hops = Arc::new(AtomicU32::new(0));
        let counter = hops.clone();

        let client = reqwest::Client::builder()
            .timeout(site.timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::custom(move |attempt| {
                if attempt.previous().len() > MAX_REDIRECTS {
                    attempt.error("too many redirects")
                } else {
                    counter.fetch_add(1, Ordering::Relaxed);
                    attempt.follow()
                }
            }))
            .build()?;

        let start = Instant::now();
        let response = match client.get(&site.url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "HTTP request error");
                return Ok(HttpOutcome::request_failed(e.to_string()));
            }
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "HTTP body read error");
                return Ok(HttpOutcome::request_failed(e.to_string()));
            }
        };

        let redirects = hops.load(Ordering::Relaxed);
        debug!(code, elapsed_ms, redirects, bytes = body.len(), "HTTP response received");

        let mut notes = Vec::new();
        let mut alert = None;

        let status = if code == site.expected_status {
            SiteStatus::Up
        } else {
            notes.push(format!(
                "Expected status {}, but got {}.",
                site.expected_status, code
            ));
            alert = Some(AlertReason::StatusMismatch {
                expected: site.expected_status,
                actual: code,
            });
            SiteStatus::DownCode(code)
        };

        let keyword = match site.active_keyword() {
            Some(keyword) => match decode_body(&body, content_type.as_deref()) {
                Some(text) => {
                    let (check, note) = search_keyword(&text, keyword);
                    notes.extend(note);
                    check
                }
                None => KeywordCheck::Error,
            },
            None => KeywordCheck::Skipped,
        };

        Ok(HttpOutcome {
            status,
            time_ms: Metric::Measured(round2(elapsed_ms)),
            content_kb: Metric::Measured(round2(body.len() as f64 / 1024.0)),
            redirects,
            keyword,
            notes,
            alert,
        })
    }
}

/// Body text in the charset the server declared.
///
/// Without a declared charset the body is read as UTF-8, or as Latin-1 when
/// it is not valid UTF-8. Malformed sequences become U+FFFD. `None` means the
/// declared charset is not one of the supported encodings.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> Option<String> {
    let charset = content_type.and_then(declared_charset);
    match charset.as_deref() {
        None => Some(match std::str::from_utf8(body) {
            Ok(text) => text.to_string(),
            Err(_) => latin1(body),
        }),
        Some("utf-8" | "utf8") => Some(String::from_utf8_lossy(body).into_owned()),
        Some(
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "windows-1252" | "cp1252"
            | "us-ascii" | "ascii",
        ) => Some(latin1(body)),
        Some("utf-16le") => Some(utf16(body, u16::from_le_bytes)),
        Some("utf-16be") => Some(utf16(body, u16::from_be_bytes)),
        Some("utf-16") => Some(match body {
            [0xfe, 0xff, rest @ ..] => utf16(rest, u16::from_be_bytes),
            [0xff, 0xfe, rest @ ..] => utf16(rest, u16::from_le_bytes),
            _ => utf16(body, u16::from_le_bytes),
        }),
        Some(other) => {
            debug!(charset = other, "Unsupported response charset, keyword search skipped");
            None
        }
    }
}

fn declared_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_ascii_lowercase())
        } else {
            None
        }
    })
}

fn latin1(body: &[u8]) -> String {
    body.iter().map(|&b| b as char).collect()
}

fn utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Case-insensitive keyword search over decoded body text.
pub fn search_keyword(text: &str, keyword: &str) -> (KeywordCheck, Option<String>) {
    if text.to_lowercase().contains(&keyword.to_lowercase()) {
        (KeywordCheck::Pass, None)
    } else {
        (
            KeywordCheck::Fail,
            Some(format!("Keyword '{}' not found in content.", keyword)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_is_case_insensitive() {
        let (check, note) = search_keyword("<h1>Welcome to the Portal</h1>", "WELCOME");
        assert_eq!(check, KeywordCheck::Pass);
        assert!(note.is_none());
    }

    #[test]
    fn test_missing_keyword_adds_note() {
        let (check, note) = search_keyword("<h1>Maintenance</h1>", "Welcome");
        assert_eq!(check, KeywordCheck::Fail);
        assert_eq!(note.as_deref(), Some("Keyword 'Welcome' not found in content."));
    }

    #[test]
    fn test_latin1_body_is_searchable() {
        let body = b"<h1>Welcome to the Caf\xe9</h1>";

        let undeclared = decode_body(body, Some("text/html")).unwrap();
        assert_eq!(search_keyword(&undeclared, "welcome").0, KeywordCheck::Pass);
        assert_eq!(search_keyword(&undeclared, "CAF\u{c9}").0, KeywordCheck::Pass);

        let declared = decode_body(body, Some("text/html; charset=ISO-8859-1")).unwrap();
        assert_eq!(declared, "<h1>Welcome to the Caf\u{e9}</h1>");
    }

    #[test]
    fn test_malformed_utf8_is_replaced() {
        let text = decode_body(b"ok \xff done", Some("text/plain; charset=\"utf-8\"")).unwrap();
        assert_eq!(text, "ok \u{fffd} done");
        assert_eq!(search_keyword(&text, "done").0, KeywordCheck::Pass);
    }

    #[test]
    fn test_utf16_with_bom() {
        let body = [0xff, 0xfe, b'h', 0, b'i', 0];
        assert_eq!(decode_body(&body, Some("text/plain; charset=utf-16")).unwrap(), "hi");
    }

    #[test]
    fn test_unknown_charset_cannot_be_decoded() {
        assert_eq!(decode_body(b"hello", Some("text/html; charset=x-klingon")), None);
        assert_eq!(decode_body(b"hello", None).as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_unparseable_url_is_a_request_failure() {
        let settings = crate::config::Settings::default();
        let site = SiteConfig::new("bad", "example.com/no-scheme", &settings);
        let outcome = HttpProbe::new().probe(&site).await.unwrap();
        assert_eq!(outcome.status, SiteStatus::DownHttpError);
        assert_eq!(outcome.time_ms, Metric::Failed);
        assert!(matches!(outcome.alert, Some(AlertReason::HttpFailure { .. })));
    }
}
