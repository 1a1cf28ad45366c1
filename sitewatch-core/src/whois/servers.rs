use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Queried for the authoritative server of any TLD missing from the table.
pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";

/// Registry WHOIS servers for the TLDs monitored sites most often use.
pub static WHOIS_SERVERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    // Generic TLDs
    m.insert("com", "whois.verisign-grs.com");
    m.insert("net", "whois.verisign-grs.com");
    m.insert("org", "whois.pir.org");
    m.insert("info", "whois.afilias.net");
    m.insert("biz", "whois.biz");
    m.insert("edu", "whois.educause.edu");
    m.insert("gov", "whois.dotgov.gov");
    m.insert("int", "whois.iana.org");
    m.insert("mobi", "whois.afilias.net");
    m.insert("name", "whois.nic.name");

    // New gTLDs
    m.insert("app", "whois.nic.google");
    m.insert("dev", "whois.nic.google");
    m.insert("page", "whois.nic.google");
    m.insert("io", "whois.nic.io");
    m.insert("ai", "whois.nic.ai");
    m.insert("xyz", "whois.nic.xyz");
    m.insert("online", "whois.nic.online");
    m.insert("site", "whois.nic.site");
    m.insert("tech", "whois.nic.tech");
    m.insert("cloud", "whois.nic.cloud");

    // Country code TLDs
    m.insert("in", "whois.registry.in");
    m.insert("uk", "whois.nic.uk");
    m.insert("de", "whois.denic.de");
    m.insert("fr", "whois.nic.fr");
    m.insert("nl", "whois.domain-registry.nl");
    m.insert("eu", "whois.eu");
    m.insert("us", "whois.nic.us");
    m.insert("ca", "whois.cira.ca");
    m.insert("au", "whois.auda.org.au");
    m.insert("jp", "whois.jprs.jp");
    m.insert("sg", "whois.sgnic.sg");
    m.insert("co", "whois.nic.co");
    m.insert("me", "whois.nic.me");
    m.insert("tv", "whois.nic.tv");
    m.insert("cc", "ccwhois.verisign-grs.com");

    m
});

pub fn get_whois_server(tld: &str) -> Option<&'static str> {
    WHOIS_SERVERS.get(tld.to_lowercase().as_str()).copied()
}

pub fn get_tld(domain: &str) -> Option<&str> {
    domain.rsplit('.').next().filter(|tld| !tld.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_servers() {
        assert_eq!(get_whois_server("com"), Some("whois.verisign-grs.com"));
        assert_eq!(get_whois_server("IN"), Some("whois.registry.in"));
        assert_eq!(get_whois_server("zz"), None);
    }

    #[test]
    fn test_get_tld() {
        assert_eq!(get_tld("example.co.uk"), Some("uk"));
        assert_eq!(get_tld("odisha.gov.in"), Some("in"));
        assert_eq!(get_tld("trailing."), None);
    }
}
