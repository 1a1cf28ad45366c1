//! `Key: value` WHOIS layout used by gTLD registries and most ccTLDs.

use once_cell::sync::Lazy;
use regex::Regex;

use super::RegistryParser;
use crate::whois::record::RegistryRecord;

static EXPIRATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^\s*(?:registry expiry date|registrar registration expiration date|expiration date|expiration time|expiry date|expires on|expires|expire date|paid-till|renewal date)[ \t]*:[ \t]*(.+?)[ \t\r]*$",
    )
    .expect("Invalid expiration regex")
});

#[derive(Debug, Clone, Default)]
pub struct GenericParser;

impl GenericParser {
    pub fn new() -> Self {
        Self
    }
}

impl RegistryParser for GenericParser {
    fn supported_tlds(&self) -> &[&str] {
        // Fallback parser
        &[]
    }

    fn parse(&self, domain: &str, server: &str, raw: &str) -> RegistryRecord {
        let mut expiration_candidates: Vec<String> = Vec::new();
        for caps in EXPIRATION.captures_iter(raw) {
            if let Some(m) = caps.get(1) {
                let value = m.as_str().to_string();
                if !value.is_empty() && !expiration_candidates.contains(&value) {
                    expiration_candidates.push(value);
                }
            }
        }

        RegistryRecord {
            domain: domain.to_string(),
            server: server.to_string(),
            expiration_candidates,
        }
    }
}
