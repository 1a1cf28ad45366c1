//! HTTP and TLS probes
//!
//! - HTTP status code, response time, size, redirects and keyword presence
//! - SSL certificate expiration

mod certificate;
mod http;
mod types;

pub use certificate::{not_after_from_der, TlsProbe};
pub use http::{decode_body, search_keyword, HttpProbe};
pub use types::{
    HttpOutcome, KeywordCheck, SiteStatus, TlsOutcome, NOTE_HTTP_FAILED, NOTE_SSL_FAILED,
};
