//! Hostname extraction and domain normalisation

use reqwest::Url;

use crate::error::{Result, WatchError};

/// Extract the bare hostname from a site URL.
///
/// Scheme, userinfo, port and path are stripped. The function never fails:
/// when the input cannot be parsed as a URL, or carries no host, the input is
/// returned unchanged so callers always have something to probe.
pub fn extract_hostname(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if !host.is_empty() => host
                .trim_start_matches('[')
                .trim_end_matches(']')
                .to_string(),
            _ => url.to_string(),
        },
        Err(_) => url.to_string(),
    }
}

/// Normalize and validate a domain name for registry lookups
///
/// This function:
/// - Removes http:// and https:// prefixes
/// - Removes www. prefix
/// - Removes trailing slashes, paths and ports
/// - Converts to lowercase
/// - Validates format (must contain dots, only alphanumeric/hyphens/dots)
pub fn normalize_domain(domain: &str) -> Result<String> {
    let domain = domain.trim().to_lowercase();

    // Remove protocol
    let domain = domain
        .strip_prefix("http://")
        .or_else(|| domain.strip_prefix("https://"))
        .unwrap_or(&domain);

    // Remove trailing slash, path and port
    let domain = domain.split('/').next().unwrap_or(domain);
    let domain = domain.split(':').next().unwrap_or(domain);

    // Remove www. prefix
    let domain = domain.strip_prefix("www.").unwrap_or(domain);

    if domain.is_empty() || !domain.contains('.') {
        return Err(WatchError::InvalidDomain(domain.to_string()));
    }

    let valid = domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !valid {
        return Err(WatchError::InvalidDomain(domain.to_string()));
    }

    if domain.contains("..") || domain.starts_with('.') || domain.ends_with('.') {
        return Err(WatchError::InvalidDomain(domain.to_string()));
    }

    for label in domain.split('.') {
        if label.is_empty() || label.starts_with('-') || label.ends_with('-') {
            return Err(WatchError::InvalidDomain(domain.to_string()));
        }
    }

    // An IP literal has no registration data
    if domain.split('.').all(|label| label.chars().all(|c| c.is_ascii_digit())) {
        return Err(WatchError::InvalidDomain(domain.to_string()));
    }

    Ok(domain.to_string())
}

/// Second-level suffixes under which names are registered one level deeper
/// (`example.co.uk`, `odisha.gov.in`).
const SECOND_LEVEL_SUFFIXES: &[&str] = &[
    // .uk
    "co.uk", "org.uk", "me.uk", "ltd.uk", "plc.uk", "net.uk", "ac.uk", "gov.uk", "nhs.uk",
    "police.uk", "sch.uk",
    // .in
    "co.in", "net.in", "org.in", "firm.in", "gen.in", "ind.in", "ac.in", "edu.in", "res.in",
    "gov.in", "nic.in", "mil.in",
    // .au / .nz
    "com.au", "net.au", "org.au", "edu.au", "gov.au", "asn.au", "id.au", "co.nz", "net.nz",
    "org.nz", "govt.nz", "ac.nz",
    // .jp / .kr / .cn / .hk / .tw / .sg / .my
    "co.jp", "ne.jp", "or.jp", "ac.jp", "go.jp", "co.kr", "or.kr", "go.kr", "com.cn",
    "net.cn", "org.cn", "gov.cn", "edu.cn", "com.hk", "org.hk", "gov.hk", "com.tw", "org.tw",
    "gov.tw", "com.sg", "org.sg", "gov.sg", "edu.sg", "com.my", "gov.my",
    // Americas
    "com.br", "net.br", "org.br", "gov.br", "com.mx", "org.mx", "gob.mx", "com.ar", "gob.ar",
    "com.co", "gov.co",
    // Africa / Middle East
    "co.za", "org.za", "gov.za", "ac.za", "co.il", "org.il", "gov.il", "ac.il", "com.tr",
    "gov.tr", "com.sa", "gov.sa", "com.eg", "gov.eg", "co.ke", "com.ng", "gov.ng",
    // Others
    "com.pk", "gov.pk", "com.bd", "gov.bd", "com.np", "gov.np", "co.id", "go.id", "ac.id",
    "com.ph", "gov.ph", "co.th", "go.th", "ac.th", "com.vn", "gov.vn", "com.ua", "gov.ua",
];

/// Reduce a hostname to the name a registry holds records for.
///
/// `api.github.com` becomes `github.com` and `portal.odisha.gov.in` becomes
/// `odisha.gov.in`. IP literals, single labels and anything already at the
/// registrable level come back lowercased but otherwise unchanged.
pub fn registrable_domain(hostname: &str) -> String {
    let host = hostname.trim().trim_end_matches('.').to_lowercase();
    if host.contains(':') || host.parse::<std::net::Ipv4Addr>().is_ok() {
        return host;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 || labels.iter().any(|label| label.is_empty()) {
        return host;
    }

    let suffix = labels[labels.len() - 2..].join(".");
    let keep = if SECOND_LEVEL_SUFFIXES.contains(&suffix.as_str()) {
        3
    } else {
        2
    };
    labels[labels.len() - keep..].join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registrable_domain() {
        assert_eq!(registrable_domain("api.github.com"), "github.com");
        assert_eq!(registrable_domain("www.Example.com"), "example.com");
        assert_eq!(registrable_domain("example.com"), "example.com");
        assert_eq!(registrable_domain("portal.odisha.gov.in"), "odisha.gov.in");
        assert_eq!(registrable_domain("odisha.gov.in"), "odisha.gov.in");
        assert_eq!(registrable_domain("a.b.shop.co.uk"), "shop.co.uk");
        assert_eq!(registrable_domain("deep.sub.example.org."), "example.org");
    }

    #[test]
    fn test_registrable_domain_leaves_odd_hosts_alone() {
        assert_eq!(registrable_domain("localhost"), "localhost");
        assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
        assert_eq!(registrable_domain("::1"), "::1");
        assert_eq!(registrable_domain("a..b.com"), "a..b.com");
        assert_eq!(registrable_domain(""), "");
    }

    #[test]
    fn test_extract_hostname() {
        assert_eq!(extract_hostname("https://example.com"), "example.com");
        assert_eq!(
            extract_hostname("https://www.example.com:8443/status?x=1"),
            "www.example.com"
        );
        assert_eq!(extract_hostname("http://user:pw@example.org/"), "example.org");
        assert_eq!(extract_hostname("http://127.0.0.1:8080/health"), "127.0.0.1");
        assert_eq!(extract_hostname("http://[::1]:8080/"), "::1");
    }

    #[test]
    fn test_extract_hostname_fails_open() {
        assert_eq!(extract_hostname("not a url"), "not a url");
        assert_eq!(extract_hostname("example.com/path"), "example.com/path");
        assert_eq!(extract_hostname(""), "");
        assert_eq!(extract_hostname("mailto:ops@example.com"), "mailto:ops@example.com");
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("example.com").unwrap(), "example.com");
        assert_eq!(normalize_domain("EXAMPLE.COM").unwrap(), "example.com");
        assert_eq!(
            normalize_domain("https://www.example.com/path").unwrap(),
            "example.com"
        );
        assert_eq!(normalize_domain("example.com:443").unwrap(), "example.com");
        assert_eq!(
            normalize_domain("  WWW.EXAMPLE.COM  ").unwrap(),
            "example.com"
        );

        assert!(normalize_domain("").is_err());
        assert!(normalize_domain("nodots").is_err());
        assert!(normalize_domain("example..com").is_err());
        assert!(normalize_domain(".example.com").is_err());
        assert!(normalize_domain("example.com.").is_err());
        assert!(normalize_domain("-example.com").is_err());
        assert!(normalize_domain("example-.com").is_err());
        assert!(normalize_domain("192.168.1.10").is_err());
    }
}
