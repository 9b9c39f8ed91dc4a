//! Pull-based DNS backend.
//!
//! Handles `dns:[//server]/host[:port]` targets. The host is looked up with a
//! [`Lookup`]: the configured one, or hickory-dns (talking to `server` when
//! the target names one).
//!
//! # Example
//!
//! ```rust,ignore
//! use chanresolve::dns::{DnsResolverConfig, DnsResolverFactory};
//! use chanresolve::resolver::{ResolverArgs, ResolverFactory, Target};
//!
//! let factory = DnsResolverFactory::new(DnsResolverConfig::default());
//! let resolver = factory.create(ResolverArgs {
//!     target: Target::parse("dns:///example.com:443")?,
//!     serializer,
//! })?;
//! let result = resolver.next().await?;
//! ```

mod config;
mod resolver;

pub use config::DnsResolverConfig;
pub use resolver::DnsResolver;

use crate::base::neterror::NetError;
use crate::lookup::{HickoryLookup, Lookup, Name};
use crate::resolver::{OrphanablePtr, ResolverArgs, ResolverFactory, ResolverRef, Target};
use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

const DEFAULT_DNS_PORT: u16 = 53;

/// Factory for [`DnsResolver`], registered under `dns`.
pub struct DnsResolverFactory {
    config: DnsResolverConfig,
    lookup: Option<Arc<dyn Lookup>>,
}

impl DnsResolverFactory {
    pub fn new(config: DnsResolverConfig) -> Self {
        Self { config, lookup: None }
    }

    /// Use `lookup` for every resolver, ignoring target authorities.
    pub fn with_lookup(mut self, lookup: Arc<dyn Lookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn config(&self) -> &DnsResolverConfig {
        &self.config
    }

    fn lookup_for(&self, target: &Target) -> Result<Arc<dyn Lookup>, NetError> {
        if let Some(lookup) = &self.lookup {
            return Ok(Arc::clone(lookup));
        }
        if target.authority().is_empty() {
            return Ok(Arc::new(HickoryLookup::new()));
        }
        let server = parse_name_server(target.authority())
            .ok_or_else(|| NetError::invalid_target(target.uri(), "DNS server must be ip[:port]"))?;
        Ok(Arc::new(HickoryLookup::with_name_server(server)))
    }
}

impl ResolverFactory for DnsResolverFactory {
    fn scheme(&self) -> &str {
        "dns"
    }

    fn validate(&self, target: &Target) -> Result<(), NetError> {
        parse_endpoint(target.endpoint(), self.config.default_port)
            .map_err(|reason| NetError::invalid_target(target.uri(), reason))?;
        if !target.authority().is_empty() && parse_name_server(target.authority()).is_none() {
            return Err(NetError::invalid_target(target.uri(), "DNS server must be ip[:port]"));
        }
        Ok(())
    }

    fn create(&self, args: ResolverArgs) -> Result<OrphanablePtr, NetError> {
        let (name, port) = parse_endpoint(args.target.endpoint(), self.config.default_port)
            .map_err(|reason| NetError::invalid_target(args.target.uri(), reason))?;
        let lookup = self.lookup_for(&args.target)?;
        let config = self.config.clone();
        let resolver = ResolverRef::new_cyclic(args.serializer, args.target.uri(), |handle| {
            DnsResolver::new(name, port, config, lookup, handle)
        });
        Ok(resolver.into_dyn().into_orphanable())
    }
}

impl fmt::Debug for DnsResolverFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsResolverFactory")
            .field("config", &self.config)
            .field("custom_lookup", &self.lookup.is_some())
            .finish()
    }
}

/// Splits `host[:port]`, `[v6]:port` or a bare IPv6 literal.
pub fn parse_endpoint(endpoint: &str, default_port: u16) -> Result<(Name, u16), &'static str> {
    if endpoint.is_empty() {
        return Err("empty host");
    }

    let (host, port) = if let Some(rest) = endpoint.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or("unterminated '['")?;
        if host.parse::<std::net::Ipv6Addr>().is_err() {
            return Err("bracketed host is not an IPv6 address");
        }
        match after {
            "" => (host, None),
            _ => (host, Some(after.strip_prefix(':').ok_or("garbage after ']'")?)),
        }
    } else if endpoint.matches(':').count() > 1 {
        if endpoint.parse::<IpAddr>().is_err() {
            return Err("too many ':'");
        }
        (endpoint, None)
    } else {
        match endpoint.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (endpoint, None),
        }
    };

    if host.is_empty() {
        return Err("empty host");
    }
    let port = match port {
        Some(port) => port.parse::<u16>().map_err(|_| "invalid port")?,
        None => default_port,
    };
    Ok((Name::new(host), port))
}

fn parse_name_server(authority: &str) -> Option<SocketAddr> {
    if let Ok(addr) = authority.parse::<SocketAddr>() {
        return Some(addr);
    }
    let ip = authority.trim_start_matches('[').trim_end_matches(']');
    ip.parse::<IpAddr>().ok().map(|ip| SocketAddr::new(ip, DEFAULT_DNS_PORT))
}
