//! DNS Resolver Tests
//!
//! Covers:
//! - Initial lookup on the first request
//! - Re-resolution inside and outside the cooldown window
//! - Lookup failures with and without a cached result, fixed-interval retry
//! - Lookup timeout
//! - Shutdown with a lookup in flight
//! - IP-literal endpoints
//!
//! Time is paused; the runtime jumps straight to the next timer when idle.

use chanresolve::base::neterror::ErrorKind;
use chanresolve::dns::{DnsResolverConfig, DnsResolverFactory};
use chanresolve::lookup::{Lookup, LookupFuture, Name};
use chanresolve::resolver::{OrphanablePtr, ResolverArgs, ResolverFactory, Target};
use chanresolve::serializer::Serializer;
use chanresolve::NetError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Answers lookups from a script, one entry per call.
#[derive(Default)]
struct ScriptedLookup {
    script: Mutex<VecDeque<Result<Vec<IpAddr>, NetError>>>,
    calls: AtomicUsize,
}

impl ScriptedLookup {
    fn new(script: Vec<Result<Vec<IpAddr>, NetError>>) -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(script.into()), calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Lookup for ScriptedLookup {
    fn lookup(&self, _name: Name) -> LookupFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front().unwrap_or(Err(NetError::NameNotResolved));
        Box::pin(async move { next })
    }
}

/// Never answers.
struct HangingLookup;

impl Lookup for HangingLookup {
    fn lookup(&self, _name: Name) -> LookupFuture {
        Box::pin(futures::future::pending())
    }
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn addrs(result: &chanresolve::ResolutionResult) -> Vec<SocketAddr> {
    result.socket_addrs().collect()
}

fn config() -> DnsResolverConfig {
    DnsResolverConfig::new()
        .min_time_between_resolutions(Duration::from_secs(30))
        .retry_interval(Duration::from_secs(1))
        .lookup_timeout(Duration::from_secs(5))
}

fn create(target: &str, config: DnsResolverConfig, lookup: Arc<dyn Lookup>) -> OrphanablePtr {
    DnsResolverFactory::new(config)
        .with_lookup(lookup)
        .create(ResolverArgs {
            target: Target::parse(target).unwrap(),
            serializer: Serializer::new(target),
        })
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_initial_lookup() {
    let lookup = ScriptedLookup::new(vec![Ok(vec![ip("10.0.0.1"), ip("10.0.0.2")])]);
    let resolver = create("dns:///svc.example:8080", config(), lookup.clone());
    assert_eq!(lookup.calls(), 0);

    let result = resolver.next().await.unwrap();
    assert_eq!(
        addrs(&result),
        vec!["10.0.0.1:8080".parse::<SocketAddr>().unwrap(), "10.0.0.2:8080".parse().unwrap()]
    );
    assert_eq!(lookup.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_default_port_applies() {
    let lookup = ScriptedLookup::new(vec![Ok(vec![ip("10.0.0.1")])]);
    let resolver = create("dns:///svc.example", config().default_port(50051), lookup);

    let result = resolver.next().await.unwrap();
    assert_eq!(addrs(&result), vec!["10.0.0.1:50051".parse::<SocketAddr>().unwrap()]);
}

#[tokio::test(start_paused = true)]
async fn test_reresolution_inside_cooldown_republishes() {
    let lookup = ScriptedLookup::new(vec![Ok(vec![ip("10.0.0.1")]), Ok(vec![ip("10.0.0.2")])]);
    let resolver = create("dns:///svc.example:80", config(), lookup.clone());
    let start = Instant::now();

    let first = resolver.next().await.unwrap();
    let pending = resolver.next();
    resolver.request_reresolution().unwrap();

    // Delivered at once, without a new lookup.
    let again = pending.await.unwrap();
    assert_eq!(addrs(&again), addrs(&first));
    assert_eq!(lookup.calls(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));

    // The deferred lookup runs when the cooldown ends.
    let fresh = resolver.next().await.unwrap();
    assert_eq!(addrs(&fresh), vec!["10.0.0.2:80".parse::<SocketAddr>().unwrap()]);
    assert_eq!(lookup.calls(), 2);
    assert!(start.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_reresolution_after_cooldown_looks_up_now() {
    let lookup = ScriptedLookup::new(vec![Ok(vec![ip("10.0.0.1")]), Ok(vec![ip("10.0.0.2")])]);
    let resolver = create("dns:///svc.example:80", config(), lookup.clone());

    resolver.next().await.unwrap();
    tokio::time::advance(Duration::from_secs(31)).await;
    let start = Instant::now();

    let pending = resolver.next();
    resolver.request_reresolution().unwrap();
    let fresh = pending.await.unwrap();

    assert_eq!(addrs(&fresh), vec!["10.0.0.2:80".parse::<SocketAddr>().unwrap()]);
    assert_eq!(lookup.calls(), 2);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_failure_without_cache_fails_then_retries() {
    let lookup = ScriptedLookup::new(vec![Err(NetError::NameNotResolved), Ok(vec![ip("10.0.0.3")])]);
    let resolver = create("dns:///svc.example:80", config(), lookup.clone());
    let start = Instant::now();

    let err = resolver.next().await.unwrap_err();
    assert!(matches!(err, NetError::NameNotResolved));
    assert_eq!(err.kind(), ErrorKind::Transient);

    let recovered = resolver.next().await.unwrap();
    assert_eq!(addrs(&recovered), vec!["10.0.0.3:80".parse::<SocketAddr>().unwrap()]);
    assert_eq!(lookup.calls(), 2);
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert!(start.elapsed() < Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_failure_with_cache_keeps_result() {
    let lookup = ScriptedLookup::new(vec![
        Ok(vec![ip("10.0.0.1")]),
        Err(NetError::NameNotResolved),
        Ok(vec![ip("10.0.0.4")]),
    ]);
    let resolver = create("dns:///svc.example:80", config(), lookup.clone());

    resolver.next().await.unwrap();
    tokio::time::advance(Duration::from_secs(31)).await;
    let start = Instant::now();

    // The failed lookup is not reported; the cached result answers the
    // re-resolution instead.
    let pending = resolver.next();
    resolver.request_reresolution().unwrap();
    let cached = pending.await.unwrap();
    assert_eq!(addrs(&cached), vec!["10.0.0.1:80".parse::<SocketAddr>().unwrap()]);
    assert_eq!(lookup.calls(), 2);
    assert!(start.elapsed() < Duration::from_secs(1));

    // The retry's answer follows.
    let fresh = resolver.next().await.unwrap();
    assert_eq!(addrs(&fresh), vec!["10.0.0.4:80".parse::<SocketAddr>().unwrap()]);
    assert_eq!(lookup.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_reresolution_answered_while_dns_stays_down() {
    // Every lookup after the first fails.
    let lookup = ScriptedLookup::new(vec![Ok(vec![ip("10.0.0.1")])]);
    let resolver = create("dns:///svc.example:80", config(), lookup.clone());

    let first = resolver.next().await.unwrap();
    tokio::time::advance(Duration::from_secs(31)).await;

    let pending = resolver.next();
    resolver.request_reresolution().unwrap();
    let cached = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .expect("re-resolution left the request pending")
        .unwrap();
    assert!(cached.ptr_eq(&first));
    assert_eq!(lookup.calls(), 2);

    // Failing retries alone do not re-publish the cache.
    let quiet = tokio::time::timeout(Duration::from_secs(10), resolver.next()).await;
    assert!(quiet.is_err());
    assert!(lookup.calls() > 2);
}

#[tokio::test(start_paused = true)]
async fn test_lookup_timeout() {
    let config = config().lookup_timeout(Duration::from_secs(2));
    let resolver = create("dns:///slow.example:80", config, Arc::new(HangingLookup));
    let start = Instant::now();

    let err = resolver.next().await.unwrap_err();
    assert!(matches!(err, NetError::LookupTimedOut { ref domain } if domain == "slow.example"));
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_with_lookup_in_flight() {
    let resolver = create("dns:///slow.example:80", config(), Arc::new(HangingLookup));
    let serializer = resolver.serializer().clone();

    let pending = resolver.next();
    serializer.flush().await.unwrap();
    resolver.orphan();

    assert!(matches!(pending.await, Err(NetError::ResolverShutdown)));
}

#[tokio::test(start_paused = true)]
async fn test_ip_literal_skips_lookup() {
    let lookup = ScriptedLookup::new(vec![]);
    let resolver = create("dns:///127.0.0.1:9000", config(), lookup.clone());

    let result = resolver.next().await.unwrap();
    assert_eq!(addrs(&result), vec!["127.0.0.1:9000".parse::<SocketAddr>().unwrap()]);

    let v6 = create("dns:///[::1]:9000", config(), lookup.clone());
    let result = v6.next().await.unwrap();
    assert_eq!(addrs(&result), vec!["[::1]:9000".parse::<SocketAddr>().unwrap()]);
    assert_eq!(lookup.calls(), 0);
}

#[tokio::test]
async fn test_factory_rejects_bad_targets() {
    let factory = DnsResolverFactory::new(DnsResolverConfig::default());
    let serializer = Serializer::new("bad-targets");

    for target in ["dns:///", "dns:///host:notaport", "dns://not-an-ip/host"] {
        let err = factory
            .create(ResolverArgs { target: Target::parse(target).unwrap(), serializer: serializer.clone() })
            .unwrap_err();
        assert!(matches!(err, NetError::InvalidTarget { .. }), "{target}: {err}");
        assert_eq!(err.status_code(), 3);
    }
}
