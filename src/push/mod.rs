//! Push-based backend.
//!
//! A [`NamingService`] hands out subscriptions; whenever the data for a name
//! changes the service pushes a new snapshot. [`PushResolver`] forwards each
//! snapshot onto the serializer and delivers it to the pending request, so
//! the owner's "ask again right after every result" loop sees every update.

mod directory;

pub use directory::Directory;

use crate::base::neterror::NetError;
use crate::resolver::{
    LockedHandle, OrphanablePtr, PendingDelivery, ResolutionResult, Resolver, ResolverArgs,
    ResolverFactory, ResolverRef, Target,
};
use std::{fmt, sync::Arc};
use tokio::{sync::watch, task::AbortHandle};

/// A live view of one name. `None` until the service has data for it; the
/// sender side going away ends the subscription.
pub type Subscription = watch::Receiver<Option<ResolutionResult>>;

/// A service that pushes updates for names.
pub trait NamingService: Send + Sync + 'static {
    fn subscribe(&self, name: &str) -> Result<Subscription, NetError>;
}

/// Resolver fed by a [`Subscription`].
///
/// Forwarding starts with the first delivery request.
pub struct PushResolver {
    name: String,
    handle: LockedHandle<PushResolver>,
    subscription: Option<Subscription>,
    pending: Option<PendingDelivery>,
    last_result: Option<ResolutionResult>,
    reported: bool,
    closed: bool,
    forwarder: Option<AbortHandle>,
}

impl PushResolver {
    pub fn new(name: impl Into<String>, subscription: Subscription, handle: LockedHandle<Self>) -> Self {
        Self {
            name: name.into(),
            handle,
            subscription: Some(subscription),
            pending: None,
            last_result: None,
            reported: false,
            closed: false,
            forwarder: None,
        }
    }

    fn start_forwarding(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        tracing::debug!(name = %self.name, "subscribing to naming service updates");
        let forwarder = self.handle.serializer().spawn(forward(
            self.name.clone(),
            subscription,
            self.handle.clone(),
        ));
        self.forwarder = Some(forwarder.abort_handle());
    }

    fn on_update(&mut self, result: ResolutionResult) {
        tracing::debug!(name = %self.name, count = result.len(), "naming service pushed an update");
        self.last_result = Some(result);
        self.reported = false;
        self.maybe_finish_next();
    }

    fn on_closed(&mut self) {
        tracing::warn!(name = %self.name, "naming service subscription closed");
        self.closed = true;
        self.forwarder = None;
        self.maybe_finish_next();
    }

    fn maybe_finish_next(&mut self) {
        let Some(delivery) = self.pending.take() else {
            return;
        };
        match &self.last_result {
            Some(result) if !self.reported => {
                self.reported = true;
                delivery.deliver(result.clone());
            }
            _ if self.closed => delivery.fail(NetError::SubscriptionClosed { name: self.name.clone() }),
            _ => self.pending = Some(delivery),
        }
    }
}

async fn forward(name: String, mut subscription: Subscription, handle: LockedHandle<PushResolver>) {
    loop {
        let current = subscription.borrow_and_update().clone();
        if let Some(result) = current {
            if handle.run_locked(move |resolver| resolver.on_update(result)).is_err() {
                return;
            }
        }
        if subscription.changed().await.is_err() {
            let _ = handle.run_locked(|resolver| resolver.on_closed());
            tracing::trace!(name = %name, "forwarder exiting");
            return;
        }
        if !handle.is_alive() {
            return;
        }
    }
}

impl Resolver for PushResolver {
    fn next_locked(&mut self, delivery: PendingDelivery) {
        self.pending = Some(delivery);
        self.start_forwarding();
        self.maybe_finish_next();
    }

    fn request_reresolution_locked(&mut self) {
        if self.last_result.is_some() {
            self.reported = false;
            self.maybe_finish_next();
        }
    }

    fn shutdown_locked(&mut self) {
        tracing::debug!(name = %self.name, "shutting down push resolver");
        self.subscription = None;
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        if let Some(delivery) = self.pending.take() {
            delivery.fail(NetError::ResolverShutdown);
        }
    }
}

/// Factory for [`PushResolver`] under a caller-chosen scheme.
pub struct PushResolverFactory {
    scheme: String,
    service: Arc<dyn NamingService>,
}

impl PushResolverFactory {
    pub fn new(scheme: impl Into<String>, service: Arc<dyn NamingService>) -> Self {
        Self { scheme: scheme.into(), service }
    }
}

impl ResolverFactory for PushResolverFactory {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn validate(&self, target: &Target) -> Result<(), NetError> {
        if target.endpoint().is_empty() {
            return Err(NetError::invalid_target(target.uri(), "empty service name"));
        }
        Ok(())
    }

    fn create(&self, args: ResolverArgs) -> Result<OrphanablePtr, NetError> {
        self.validate(&args.target)?;
        let name = args.target.endpoint().to_string();
        let subscription = self.service.subscribe(&name)?;
        let resolver = ResolverRef::new_cyclic(args.serializer, args.target.uri(), |handle| {
            PushResolver::new(name, subscription, handle)
        });
        Ok(resolver.into_dyn().into_orphanable())
    }
}

impl fmt::Debug for PushResolverFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushResolverFactory").field("scheme", &self.scheme).finish_non_exhaustive()
    }
}
