//! Resolution snapshots.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, net::SocketAddr, sync::Arc};

/// One backend address plus per-address attributes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerAddress {
    pub addr: SocketAddr,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ServerAddress {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, attributes: BTreeMap::new() }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl From<SocketAddr> for ServerAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    addresses: Vec<ServerAddress>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service_config: Option<String>,
}

/// An immutable snapshot of everything a resolver knows about a target.
///
/// Each delivery is complete; there is no partial form. Cloning shares the
/// snapshot, so re-delivering the last-known-good result is cheap.
///
/// The service config is carried as an opaque string and never parsed here.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionResult {
    inner: Arc<Snapshot>,
}

impl ResolutionResult {
    pub fn builder() -> ResolutionResultBuilder {
        ResolutionResultBuilder::default()
    }

    /// Builds a result from bare socket addresses.
    pub fn from_addrs(addrs: impl IntoIterator<Item = SocketAddr>) -> Self {
        Self::builder().addresses(addrs).build()
    }

    pub fn addresses(&self) -> &[ServerAddress] {
        &self.inner.addresses
    }

    /// Socket addresses only, in delivery order.
    pub fn socket_addrs(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.inner.addresses.iter().map(|a| a.addr)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.inner.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.inner.attributes.get(key).map(String::as_str)
    }

    pub fn service_config(&self) -> Option<&str> {
        self.inner.service_config.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.addresses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.addresses.len()
    }

    /// Returns true when both handles point at the same snapshot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionResult")
            .field("addresses", &self.inner.addresses)
            .field("attributes", &self.inner.attributes)
            .field("has_service_config", &self.inner.service_config.is_some())
            .finish()
    }
}

/// Builder for [`ResolutionResult`].
#[derive(Debug, Default)]
pub struct ResolutionResultBuilder {
    snapshot: Snapshot,
}

impl ResolutionResultBuilder {
    pub fn address(mut self, address: impl Into<ServerAddress>) -> Self {
        self.snapshot.addresses.push(address.into());
        self
    }

    pub fn addresses(mut self, addrs: impl IntoIterator<Item = SocketAddr>) -> Self {
        self.snapshot.addresses.extend(addrs.into_iter().map(ServerAddress::new));
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.snapshot.attributes.insert(key.into(), value.into());
        self
    }

    pub fn service_config(mut self, config: impl Into<String>) -> Self {
        self.snapshot.service_config = Some(config.into());
        self
    }

    pub fn build(self) -> ResolutionResult {
        ResolutionResult { inner: Arc::new(self.snapshot) }
    }
}
