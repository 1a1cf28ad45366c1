mod client;
pub mod parsers;
mod record;
mod servers;

pub use client::WhoisClient;
pub use record::{LookupFuture, RegistryLookup, RegistryRecord};
pub use servers::{get_tld, get_whois_server};
