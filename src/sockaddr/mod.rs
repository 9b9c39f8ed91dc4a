//! Literal-address backend for `ipv4:` and `ipv6:` targets.
//!
//! `ipv4:10.0.0.1:80,10.0.0.2:80` resolves to exactly those addresses. There
//! is nothing to query, so re-resolution just hands the same list back.

use crate::base::neterror::NetError;
use crate::resolver::{
    OrphanablePtr, PendingDelivery, ResolutionResult, Resolver, ResolverArgs, ResolverFactory,
    ResolverRef, Target,
};
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    V4,
    V6,
}

/// Resolver over a fixed address list.
#[derive(Debug)]
pub struct StaticResolver {
    result: ResolutionResult,
    pending: Option<PendingDelivery>,
    reported: bool,
}

impl StaticResolver {
    pub fn new(result: ResolutionResult) -> Self {
        Self { result, pending: None, reported: false }
    }

    fn maybe_finish_next(&mut self) {
        if self.reported {
            return;
        }
        if let Some(delivery) = self.pending.take() {
            self.reported = true;
            delivery.deliver(self.result.clone());
        }
    }
}

impl Resolver for StaticResolver {
    fn next_locked(&mut self, delivery: PendingDelivery) {
        self.pending = Some(delivery);
        self.maybe_finish_next();
    }

    fn request_reresolution_locked(&mut self) {
        self.reported = false;
        self.maybe_finish_next();
    }

    fn shutdown_locked(&mut self) {
        if let Some(delivery) = self.pending.take() {
            delivery.fail(NetError::ResolverShutdown);
        }
    }
}

/// Factory for [`StaticResolver`], one per address family.
#[derive(Debug)]
pub struct StaticResolverFactory {
    family: Family,
}

impl StaticResolverFactory {
    pub fn ipv4() -> Self {
        Self { family: Family::V4 }
    }

    pub fn ipv6() -> Self {
        Self { family: Family::V6 }
    }

    fn parse(&self, target: &Target) -> Result<Vec<SocketAddr>, NetError> {
        if !target.authority().is_empty() {
            return Err(NetError::invalid_target(target.uri(), "authority is not supported"));
        }
        let mut addrs = Vec::new();
        for part in target.endpoint().split(',') {
            let addr: SocketAddr = part
                .trim()
                .parse()
                .map_err(|_| NetError::invalid_target(target.uri(), format!("bad address {:?}", part)))?;
            let family_ok = match self.family {
                Family::V4 => addr.is_ipv4(),
                Family::V6 => addr.is_ipv6(),
            };
            if !family_ok {
                return Err(NetError::invalid_target(
                    target.uri(),
                    format!("{} is not in the {} family", addr, self.scheme()),
                ));
            }
            addrs.push(addr);
        }
        Ok(addrs)
    }
}

impl ResolverFactory for StaticResolverFactory {
    fn scheme(&self) -> &str {
        match self.family {
            Family::V4 => "ipv4",
            Family::V6 => "ipv6",
        }
    }

    fn validate(&self, target: &Target) -> Result<(), NetError> {
        self.parse(target).map(|_| ())
    }

    fn create(&self, args: ResolverArgs) -> Result<OrphanablePtr, NetError> {
        let result = ResolutionResult::from_addrs(self.parse(&args.target)?);
        let resolver =
            ResolverRef::new(args.serializer, args.target.uri(), StaticResolver::new(result));
        Ok(resolver.into_dyn().into_orphanable())
    }
}
