//! Host lookups for the DNS backend.
//!
//! [`Lookup`] turns a host name into IP addresses. It is the blocking or
//! network-facing half of the pull-based resolver: the
//! [`DnsResolver`](crate::dns::DnsResolver) runs lookups off the serializer
//! and marshals their results back.
//!
//! - [`SystemLookup`]: `getaddrinfo` on tokio's blocking pool
//! - [`HickoryLookup`]: fully async hickory-dns
//! - [`LookupWithOverrides`]: fixed answers in front of another lookup

mod hickory;
mod overrides;
mod system;

pub use hickory::HickoryLookup;
pub use overrides::LookupWithOverrides;
pub use system::SystemLookup;

use crate::base::neterror::NetError;
use futures::future::BoxFuture;
use std::{fmt, net::IpAddr, sync::Arc};

/// A host name to look up.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct Name {
    host: Box<str>,
}

impl Name {
    #[inline]
    pub fn new(host: impl Into<Box<str>>) -> Self {
        Self { host: host.into() }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.host
    }

    /// The address itself, when the name is already an IP literal.
    pub fn ip_literal(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::new(value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.host, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host, f)
    }
}

/// The future returned by a lookup. Never empty on success.
pub type LookupFuture = BoxFuture<'static, Result<Vec<IpAddr>, NetError>>;

/// Resolves host names to addresses.
///
/// Implementations must be cheap to call concurrently; the future must not
/// borrow `self`.
pub trait Lookup: Send + Sync + 'static {
    fn lookup(&self, name: Name) -> LookupFuture;
}

impl<L: Lookup + ?Sized> Lookup for Arc<L> {
    fn lookup(&self, name: Name) -> LookupFuture {
        (**self).lookup(name)
    }
}
