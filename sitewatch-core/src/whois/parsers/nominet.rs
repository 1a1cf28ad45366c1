//! Parser for .uk domains (Nominet format).
//!
//! Nominet uses section headers followed by indented values, with dates in
//! a human-readable form:
//!
//! ```text
//! Relevant dates:
//!     Registered on: 01-Jan-2020
//!     Expiry date:  01-Jan-2027
//! ```
//!
//! Older responses put each date under its own header instead.

use super::RegistryParser;
use crate::whois::record::RegistryRecord;

#[derive(Debug, Clone, Default)]
pub struct NominetParser;

impl NominetParser {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    ExpiryDate,
    Other,
}

fn section_for(header: &str) -> Section {
    match header.to_lowercase().as_str() {
        "expiry date" => Section::ExpiryDate,
        _ => Section::Other,
    }
}

impl RegistryParser for NominetParser {
    fn supported_tlds(&self) -> &[&str] {
        &[
            "uk", "co.uk", "org.uk", "me.uk", "ltd.uk", "plc.uk", "net.uk", "sch.uk",
        ]
    }

    fn parse(&self, domain: &str, server: &str, raw: &str) -> RegistryRecord {
        let mut expiration_candidates: Vec<String> = Vec::new();
        let mut section = Section::None;

        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                section = Section::None;
                continue;
            }

            let indented = line.starts_with("    ") || line.starts_with('\t');

            // "Header:" on a line of its own opens a section
            if let Some(header) = trimmed.strip_suffix(':') {
                if !header.contains(':') {
                    section = section_for(header);
                    continue;
                }
            }

            if indented {
                // Inline "Expiry date: 01-Jan-2027" inside "Relevant dates:"
                if let Some((key, value)) = trimmed.split_once(':') {
                    if key.trim().eq_ignore_ascii_case("expiry date") {
                        push_candidate(&mut expiration_candidates, value.trim());
                        continue;
                    }
                }

                if section == Section::ExpiryDate {
                    push_candidate(&mut expiration_candidates, trimmed);
                }
            } else {
                section = Section::None;
                if let Some((key, value)) = trimmed.split_once(':') {
                    if key.trim().eq_ignore_ascii_case("expiry date") {
                        push_candidate(&mut expiration_candidates, value.trim());
                    }
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

fn push_candidate(candidates: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !candidates.iter().any(|c| c == value) {
        candidates.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELEVANT_DATES_LAYOUT: &str = r#"
    Domain name:
        example.co.uk

    Registrar:
        Registrar Name Ltd [Tag = REGISTRAR]
        URL: https://registrar.example

    Relevant dates:
        Registered on: 01-Jan-2020
        Expiry date:  01-Jan-2027
        Last updated:  15-Jun-2023

    Registration status:
        Registered until expiry date.
"#;

    const SECTION_LAYOUT: &str = r#"
Domain name:
    example.co.uk

Registrar:
    Another Registrar

Registration date:
    15-March-2019

Expiry date:
    15-March-2027

Name servers:
    ns1.test.co.uk
"#;

    #[test]
    fn test_relevant_dates_layout() {
        let record = NominetParser::new().parse("example.co.uk", "whois.nic.uk", RELEVANT_DATES_LAYOUT);
        assert_eq!(record.expiration_candidates, vec!["01-Jan-2027".to_string()]);
    }

    #[test]
    fn test_section_layout() {
        let record = NominetParser::new().parse("example.co.uk", "whois.nic.uk", SECTION_LAYOUT);
        assert_eq!(record.expiration_candidates, vec!["15-March-2027".to_string()]);
    }

    #[test]
    fn test_status_text_is_not_a_candidate() {
        // "Registered until expiry date." mentions the key but is not a value
        let raw = "Registration status:\n    Registered until expiry date.\n";
        let record = NominetParser::new().parse("example.co.uk", "whois.nic.uk", raw);
        assert!(record.expiration_candidates.is_empty());
    }

    #[test]
    fn test_supported_tlds() {
        let parser = NominetParser::new();
        assert!(parser.supported_tlds().contains(&"uk"));
        assert!(parser.supported_tlds().contains(&"co.uk"));
    }
}
