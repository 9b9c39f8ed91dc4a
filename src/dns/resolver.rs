use super::config::DnsResolverConfig;
use crate::base::neterror::NetError;
use crate::lookup::{Lookup, Name};
use crate::resolver::{LockedHandle, PendingDelivery, ResolutionResult, Resolver};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::{task::AbortHandle, time::Instant};

/// Pull-based resolver: looks the name up, and looks it up again when asked.
///
/// Lookups and timers run as tokio tasks off the serializer and report back
/// through the resolver's [`LockedHandle`].
///
/// - The first delivery request starts the initial lookup.
/// - A re-resolution request inside the cooldown window
///   (`min_time_between_resolutions`) arms a timer for the remainder and
///   re-publishes the last result at once, so the owner is never left
///   waiting on the cooldown.
/// - A failed lookup keeps the cached result if there is one; without one the
///   pending delivery fails. Either way the lookup is retried after
///   `retry_interval`.
pub struct DnsResolver {
    name: Name,
    port: u16,
    config: DnsResolverConfig,
    lookup: Arc<dyn Lookup>,
    handle: LockedHandle<DnsResolver>,

    pending: Option<PendingDelivery>,
    last_result: Option<ResolutionResult>,
    unreported_error: Option<NetError>,
    // Bumped on every new or re-published result; delivered once per bump.
    resolved_version: u64,
    published_version: u64,
    // A re-resolution request still owed a delivery.
    reresolution_owed: bool,

    started: bool,
    last_lookup_at: Option<Instant>,
    lookup_task: Option<AbortHandle>,
    timer_task: Option<AbortHandle>,
}

impl DnsResolver {
    pub fn new(
        name: Name,
        port: u16,
        config: DnsResolverConfig,
        lookup: Arc<dyn Lookup>,
        handle: LockedHandle<DnsResolver>,
    ) -> Self {
        Self {
            name,
            port,
            config,
            lookup,
            handle,
            pending: None,
            last_result: None,
            unreported_error: None,
            resolved_version: 0,
            published_version: 0,
            reresolution_owed: false,
            started: false,
            last_lookup_at: None,
            lookup_task: None,
            timer_task: None,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn start_lookup(&mut self) {
        self.cancel_timer();
        self.last_lookup_at = Some(Instant::now());

        if let Some(ip) = self.name.ip_literal() {
            self.on_lookup_done(Ok(vec![ip]));
            return;
        }

        tracing::debug!(host = %self.name, "starting lookup");
        let lookup = self.lookup.lookup(self.name.clone());
        let timeout = self.config.lookup_timeout;
        let domain = self.name.to_string();
        let handle = self.handle.clone();
        let task = self.handle.serializer().spawn(async move {
            let result = match tokio::time::timeout(timeout, lookup).await {
                Ok(result) => result,
                Err(_) => Err(NetError::LookupTimedOut { domain }),
            };
            let _ = handle.run_locked(move |resolver| {
                resolver.lookup_task = None;
                resolver.on_lookup_done(result);
            });
        });
        self.lookup_task = Some(task.abort_handle());
    }

    fn on_lookup_done(&mut self, result: Result<Vec<IpAddr>, NetError>) {
        match result {
            Ok(ips) => {
                let port = self.port;
                let result = ResolutionResult::builder()
                    .addresses(ips.into_iter().map(|ip| SocketAddr::new(ip, port)))
                    .build();
                tracing::debug!(host = %self.name, count = result.len(), "lookup succeeded");
                self.last_result = Some(result);
                self.unreported_error = None;
                self.resolved_version += 1;
            }
            Err(e) => {
                if self.last_result.is_some() {
                    tracing::warn!(host = %self.name, error = %e, "lookup failed; keeping last result");
                    if self.reresolution_owed {
                        // Re-resolution must still be answered: hand back the cache.
                        self.resolved_version += 1;
                    }
                } else {
                    tracing::warn!(host = %self.name, error = %e, "lookup failed with nothing cached");
                    self.unreported_error = Some(e);
                }
                self.arm_timer(self.config.retry_interval);
            }
        }
        self.maybe_finish_next();
    }

    fn maybe_finish_next(&mut self) {
        if self.pending.is_none() {
            return;
        }
        if self.published_version < self.resolved_version {
            if let (Some(delivery), Some(result)) = (self.pending.take(), self.last_result.as_ref()) {
                self.published_version = self.resolved_version;
                self.reresolution_owed = false;
                delivery.deliver(result.clone());
            }
        } else if let Some(error) = self.unreported_error.take() {
            if let Some(delivery) = self.pending.take() {
                self.reresolution_owed = false;
                delivery.fail(error);
            }
        }
    }

    fn arm_timer(&mut self, delay: Duration) {
        if self.timer_task.is_some() {
            return;
        }
        tracing::trace!(host = %self.name, delay_ms = delay.as_millis() as u64, "arming lookup timer");
        let handle = self.handle.clone();
        let task = self.handle.serializer().spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = handle.run_locked(|resolver| {
                resolver.timer_task = None;
                if resolver.lookup_task.is_none() {
                    resolver.start_lookup();
                }
            });
        });
        self.timer_task = Some(task.abort_handle());
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer_task.take() {
            timer.abort();
        }
    }
}

impl Resolver for DnsResolver {
    fn next_locked(&mut self, delivery: PendingDelivery) {
        debug_assert!(self.pending.is_none());
        self.pending = Some(delivery);
        if !self.started {
            self.started = true;
            self.start_lookup();
        } else {
            self.maybe_finish_next();
        }
    }

    fn request_reresolution_locked(&mut self) {
        if !self.started {
            return;
        }
        self.reresolution_owed = true;
        if self.lookup_task.is_some() {
            // The in-flight lookup answers it, with new data or the cache.
            return;
        }
        let cooldown = self.config.min_time_between_resolutions;
        let remaining = self
            .last_lookup_at
            .map(|at| cooldown.saturating_sub(at.elapsed()))
            .unwrap_or(Duration::ZERO);

        if remaining.is_zero() {
            self.start_lookup();
            return;
        }

        tracing::debug!(
            host = %self.name,
            remaining_ms = remaining.as_millis() as u64,
            "re-resolution inside cooldown; re-publishing last result"
        );
        self.arm_timer(remaining);
        if self.last_result.is_some() {
            self.resolved_version += 1;
            self.maybe_finish_next();
        }
    }

    fn shutdown_locked(&mut self) {
        tracing::debug!(host = %self.name, "shutting down dns resolver");
        if let Some(lookup) = self.lookup_task.take() {
            lookup.abort();
        }
        self.cancel_timer();
        if let Some(delivery) = self.pending.take() {
            delivery.fail(NetError::ResolverShutdown);
        }
    }
}
