//! Scheme-keyed resolver factories.

use super::{OrphanablePtr, Target};
use crate::base::neterror::NetError;
use crate::dns::{DnsResolverConfig, DnsResolverFactory};
use crate::serializer::Serializer;
use crate::sockaddr::StaticResolverFactory;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Everything a factory needs to build a resolver.
#[derive(Debug, Clone)]
pub struct ResolverArgs {
    pub target: Target,
    pub serializer: Serializer,
}

/// Builds resolvers for one URI scheme.
pub trait ResolverFactory: Send + Sync {
    fn scheme(&self) -> &str;

    /// Rejects targets this factory can never resolve.
    fn validate(&self, target: &Target) -> Result<(), NetError>;

    /// Builds a resolver holding one reference, owned by the caller.
    fn create(&self, args: ResolverArgs) -> Result<OrphanablePtr, NetError>;
}

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Prepended to targets that have no registered scheme
    pub default_prefix: String,
    /// Used by the default `dns` factory
    pub dns: DnsResolverConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { default_prefix: "dns:///".to_string(), dns: DnsResolverConfig::default() }
    }
}

impl RegistryConfig {
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| NetError::InvalidConfig(e.to_string()))?;
        config.dns.validate()?;
        Ok(config)
    }
}

/// Maps URI schemes to resolver factories.
///
/// A target whose scheme is missing or unknown is retried once with the
/// default prefix, so `example.com:443` resolves as `dns:///example.com:443`.
pub struct ResolverRegistry {
    factories: DashMap<String, Arc<dyn ResolverFactory>>,
    default_prefix: String,
}

impl ResolverRegistry {
    /// An empty registry.
    pub fn new(default_prefix: impl Into<String>) -> Self {
        Self { factories: DashMap::new(), default_prefix: default_prefix.into() }
    }

    /// A registry with the `dns`, `ipv4` and `ipv6` factories.
    pub fn with_defaults(config: RegistryConfig) -> Self {
        let registry = Self::new(config.default_prefix);
        registry.register(Arc::new(DnsResolverFactory::new(config.dns)));
        registry.register(Arc::new(StaticResolverFactory::ipv4()));
        registry.register(Arc::new(StaticResolverFactory::ipv6()));
        registry
    }

    /// Registers `factory`, returning the one it replaced.
    pub fn register(&self, factory: Arc<dyn ResolverFactory>) -> Option<Arc<dyn ResolverFactory>> {
        let scheme = factory.scheme().to_ascii_lowercase();
        tracing::debug!(scheme = %scheme, "registering resolver factory");
        self.factories.insert(scheme, factory)
    }

    pub fn factory(&self, scheme: &str) -> Option<Arc<dyn ResolverFactory>> {
        self.factories.get(&scheme.to_ascii_lowercase()).map(|f| Arc::clone(f.value()))
    }

    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    /// Finds the factory for `target`, applying the default prefix if needed.
    pub fn find(&self, target: &str) -> Result<(Arc<dyn ResolverFactory>, Target), NetError> {
        if let Ok(parsed) = Target::parse(target) {
            if let Some(factory) = self.factory(parsed.scheme()) {
                return Ok((factory, parsed));
            }
        }

        let prefixed = format!("{}{}", self.default_prefix, target);
        let parsed = Target::parse(&prefixed)?;
        match self.factory(parsed.scheme()) {
            Some(factory) => Ok((factory, parsed)),
            None => Err(NetError::UnknownScheme(parsed.scheme().to_string())),
        }
    }

    pub fn is_valid_target(&self, target: &str) -> bool {
        self.find(target).and_then(|(factory, parsed)| factory.validate(&parsed)).is_ok()
    }

    /// Creates a resolver for `target` bound to `serializer`.
    pub fn create_resolver(
        &self,
        target: &str,
        serializer: Serializer,
    ) -> Result<OrphanablePtr, NetError> {
        let (factory, target) = self.find(target)?;
        factory.validate(&target)?;
        tracing::debug!(target_uri = %target, scheme = %target.scheme(), "creating resolver");
        factory.create(ResolverArgs { target, serializer })
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::with_defaults(RegistryConfig::default())
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        schemes.sort();
        f.debug_struct("ResolverRegistry")
            .field("schemes", &schemes)
            .field("default_prefix", &self.default_prefix)
            .finish()
    }
}
