//! Async lookups with hickory-dns.
//!
//! Unlike [`SystemLookup`](super::SystemLookup) no blocking threads are
//! involved, and a target may name its own DNS server.

use super::{Lookup, LookupFuture, Name};
use crate::base::context::AddrsResultExt;
use crate::base::neterror::NetError;
use hickory_resolver::{
    config::{LookupIpStrategy, NameServerConfigGroup, ResolverConfig},
    name_server::TokioConnectionProvider,
    TokioResolver,
};
use std::{
    io,
    net::{IpAddr, SocketAddr},
    sync::{Arc, LazyLock},
};

/// Lookup backed by hickory-dns.
///
/// [`HickoryLookup::new`] shares one lazily built resolver that follows the
/// system configuration. [`HickoryLookup::with_name_server`] builds a
/// dedicated resolver for a single server, as named by a
/// `dns://server/host` target.
#[derive(Clone)]
pub struct HickoryLookup {
    resolver: Arc<TokioResolver>,
}

impl HickoryLookup {
    pub fn new() -> Self {
        static SHARED: LazyLock<Arc<TokioResolver>> = LazyLock::new(|| {
            let mut builder = match TokioResolver::builder_tokio() {
                Ok(builder) => {
                    tracing::debug!("using system DNS configuration");
                    builder
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read system DNS config, using defaults");
                    TokioResolver::builder_with_config(
                        ResolverConfig::default(),
                        TokioConnectionProvider::default(),
                    )
                }
            };
            builder.options_mut().ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
            Arc::new(builder.build())
        });

        Self { resolver: Arc::clone(&SHARED) }
    }

    pub fn with_name_server(server: SocketAddr) -> Self {
        let group = NameServerConfigGroup::from_ips_clear(&[server.ip()], server.port(), true);
        let config = ResolverConfig::from_parts(None, vec![], group);
        let mut builder =
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default());
        builder.options_mut().ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
        tracing::debug!(server = %server, "using dedicated DNS server");
        Self { resolver: Arc::new(builder.build()) }
    }
}

impl Default for HickoryLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HickoryLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryLookup").finish_non_exhaustive()
    }
}

impl Lookup for HickoryLookup {
    fn lookup(&self, name: Name) -> LookupFuture {
        let resolver = Arc::clone(&self.resolver);
        Box::pin(async move {
            if let Some(ip) = name.ip_literal() {
                return Ok(vec![ip]);
            }

            let domain = name.as_str();
            tracing::debug!(domain = %domain, "looking up via hickory-dns");

            let ips: Result<Vec<IpAddr>, NetError> = resolver
                .lookup_ip(domain)
                .await
                .map(|lookup| lookup.iter().collect())
                .map_err(|e| {
                    tracing::debug!(domain = %domain, error = %e, "hickory-dns lookup failed");
                    NetError::dns_failed(domain, io::Error::new(io::ErrorKind::NotFound, e.to_string()))
                });
            let ips = ips.non_empty(domain)?;

            tracing::debug!(domain = %domain, count = ips.len(), "hickory-dns lookup complete");
            Ok(ips)
        })
    }
}
