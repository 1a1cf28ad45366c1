mod resolver;

pub use resolver::{DnsOutcome, DnsProbe, NOTE_DNS_FAILED};
