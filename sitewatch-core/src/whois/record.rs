use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::error::Result;

/// What the domain expiry probe needs from a registry response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryRecord {
    pub domain: String,
    /// Server whose response was parsed
    pub server: String,
    /// Raw expiration values in document order; registries may list several
    /// or none, and not every value is guaranteed to be a date
    pub expiration_candidates: Vec<String>,
}

pub type LookupFuture<'a> = Pin<Box<dyn Future<Output = Result<RegistryRecord>> + Send + 'a>>;

/// Source of registration data for a domain.
///
/// Object safe so the checker can hold an `Arc<dyn RegistryLookup>` and
/// tests can substitute a canned registry.
pub trait RegistryLookup: Send + Sync {
    fn lookup<'a>(&'a self, domain: &'a str) -> LookupFuture<'a>;
}
