//! System lookup through `getaddrinfo`.
//!
//! Respects the host's resolver configuration (/etc/hosts, resolv.conf,
//! nsswitch). Each lookup occupies a blocking-pool thread.

use super::{Lookup, LookupFuture, Name};
use crate::base::context::{AddrsResultExt, IoResultExt};
use crate::base::neterror::NetError;
use std::net::{IpAddr, ToSocketAddrs};

#[derive(Clone, Debug, Default)]
pub struct SystemLookup;

impl SystemLookup {
    pub fn new() -> Self {
        Self
    }
}

impl Lookup for SystemLookup {
    fn lookup(&self, name: Name) -> LookupFuture {
        Box::pin(async move {
            if let Some(ip) = name.ip_literal() {
                return Ok(vec![ip]);
            }

            let host = name.as_str().to_string();
            let joined = tokio::task::spawn_blocking(move || {
                tracing::debug!(host = %host, "looking up via getaddrinfo");
                (host.as_str(), 0u16)
                    .to_socket_addrs()
                    .map(|iter| iter.map(|addr| addr.ip()).collect::<Vec<IpAddr>>())
                    .dns_context(&host)
            })
            .await;

            let ips = joined
                .map_err(|e| {
                    tracing::error!(error = %e, "getaddrinfo task failed");
                    NetError::NameNotResolved
                })
                .and_then(|result| result)
                .non_empty(name.as_str())?;

            tracing::debug!(host = %name, count = ips.len(), "getaddrinfo lookup complete");
            Ok(dedup(ips))
        })
    }
}

// getaddrinfo returns one entry per socket type.
fn dedup(ips: Vec<IpAddr>) -> Vec<IpAddr> {
    let mut unique = Vec::with_capacity(ips.len());
    for ip in ips {
        if !unique.contains(&ip) {
            unique.push(ip);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_dedup_keeps_order() {
        let a = IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1));
        let b = IpAddr::V4(Ipv4Addr::new(2, 2, 2, 2));
        assert_eq!(dedup(vec![a, a, b, a, b]), vec![a, b]);
    }

    #[tokio::test]
    async fn test_ip_literal_skips_getaddrinfo() {
        let ips = SystemLookup::new().lookup(Name::new("192.0.2.7")).await.unwrap();
        assert_eq!(ips, vec![IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7))]);
    }

    #[tokio::test]
    async fn test_localhost() {
        let ips = SystemLookup::new().lookup(Name::new("localhost")).await;
        if let Ok(ips) = ips {
            assert!(!ips.is_empty());
            assert!(ips.iter().all(|ip| ip.is_loopback()));
        }
    }
}
