use super::{Lookup, LookupFuture, Name};
use std::{borrow::Cow, collections::HashMap, fmt, net::IpAddr, sync::Arc};

/// Answers some names from a fixed table, the rest from `inner`.
///
/// Handy for tests and for pinning a service name to known addresses.
pub struct LookupWithOverrides {
    inner: Arc<dyn Lookup>,
    overrides: Arc<HashMap<Cow<'static, str>, Vec<IpAddr>>>,
}

impl LookupWithOverrides {
    pub fn new(inner: Arc<dyn Lookup>, overrides: HashMap<Cow<'static, str>, Vec<IpAddr>>) -> Self {
        Self { inner, overrides: Arc::new(overrides) }
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

impl Lookup for LookupWithOverrides {
    fn lookup(&self, name: Name) -> LookupFuture {
        match self.overrides.get(name.as_str()) {
            Some(ips) => Box::pin(std::future::ready(Ok(ips.clone()))),
            None => self.inner.lookup(name),
        }
    }
}

impl fmt::Debug for LookupWithOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupWithOverrides")
            .field("override_count", &self.overrides.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct FixedLookup(Vec<IpAddr>);

    impl Lookup for FixedLookup {
        fn lookup(&self, _name: Name) -> LookupFuture {
            let ips = self.0.clone();
            Box::pin(async move { Ok(ips) })
        }
    }

    fn overridden() -> LookupWithOverrides {
        let inner = Arc::new(FixedLookup(vec![IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))]));
        let mut overrides = HashMap::new();
        overrides.insert(Cow::Borrowed("svc.local"), vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);
        LookupWithOverrides::new(inner, overrides)
    }

    #[tokio::test]
    async fn test_override_hit() {
        let ips = overridden().lookup(Name::new("svc.local")).await.unwrap();
        assert_eq!(ips, vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);
    }

    #[tokio::test]
    async fn test_override_miss() {
        let lookup = overridden();
        assert_eq!(lookup.override_count(), 1);
        let ips = lookup.lookup(Name::new("other.example")).await.unwrap();
        assert_eq!(ips, vec![IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))]);
    }
}
