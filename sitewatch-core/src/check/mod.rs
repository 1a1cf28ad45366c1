//! Per-site check: probes, composition and the resulting record.

mod composer;
mod pipeline;
mod result;

pub use composer::{compose, ProbeOutputs, SiteReport};
pub use pipeline::SiteChecker;
pub use result::{CheckResult, CSV_HEADER};
