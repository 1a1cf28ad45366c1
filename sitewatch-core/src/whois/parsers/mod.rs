//! Registry-specific WHOIS response parsers.
//!
//! Registries disagree on field names and layout. Each parser reduces a raw
//! response to a [`RegistryRecord`]; date interpretation is left to the
//! domain expiry probe so that format quirks stay behind one interface.

mod generic;
mod nominet;

use once_cell::sync::Lazy;

use super::record::RegistryRecord;
pub use generic::GenericParser;
pub use nominet::NominetParser;

/// Parser for the responses of one family of registries.
pub trait RegistryParser: Send + Sync {
    /// TLDs (or second-level suffixes such as `co.uk`) handled by this parser.
    fn supported_tlds(&self) -> &[&str];

    fn parse(&self, domain: &str, server: &str, raw: &str) -> RegistryRecord;
}

/// Picks a specialised parser by suffix and falls back to the generic one.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn RegistryParser>>,
    fallback: GenericParser,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: vec![Box::new(NominetParser::new())],
            fallback: GenericParser::new(),
        }
    }

    pub fn parse(&self, domain: &str, server: &str, raw: &str) -> RegistryRecord {
        let tld = extract_tld(domain);
        let sld_tld = extract_second_level_tld(domain);

        for parser in &self.parsers {
            let supported = parser.supported_tlds();
            let matches_sld = sld_tld
                .as_deref()
                .is_some_and(|sld| supported.contains(&sld));
            let matches_tld = tld.as_deref().is_some_and(|t| supported.contains(&t));
            if matches_sld || matches_tld {
                let record = parser.parse(domain, server, raw);
                // Nominet also relays registrar responses in gTLD format
                if !record.expiration_candidates.is_empty() {
                    return record;
                }
            }
        }

        self.fallback.parse(domain, server, raw)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub static PARSER_REGISTRY: Lazy<ParserRegistry> = Lazy::new(ParserRegistry::new);

fn extract_tld(domain: &str) -> Option<String> {
    domain.rsplit('.').next().map(|s| s.to_lowercase())
}

/// `co.uk` from `example.co.uk`
fn extract_second_level_tld(domain: &str) -> Option<String> {
    let parts: Vec<&str> = domain.rsplit('.').collect();
    if parts.len() >= 2 {
        Some(format!("{}.{}", parts[1].to_lowercase(), parts[0].to_lowercase()))
    } else {
        None
    }
}
