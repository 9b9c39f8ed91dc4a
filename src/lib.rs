//! # chanresolve
//!
//! Asynchronous name resolution for RPC client channels.
//!
//! `chanresolve` gives a channel one resolver contract for every kind of
//! discovery backend. Pull-based backends (DNS) have to query again to learn
//! about changes; push-based backends (naming-service subscriptions) are told.
//! Both deliver address snapshots through the same single-outstanding-request
//! API, and both run all of their state changes on a serializer.
//!
//! ## Features
//!
//! - **One request at a time**: a resolver holds at most one pending delivery
//! - **Safe teardown**: orphaning schedules shutdown on the serializer, and
//!   the resolver stays alive until every reference is released
//! - **DNS backend**: hickory-dns or getaddrinfo lookups, re-resolution
//!   cooldown, fixed-interval retry
//! - **Push backend**: naming-service subscriptions over `tokio::sync::watch`
//! - **Registry**: scheme-keyed factories with a `dns:///` default prefix
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chanresolve::resolver::ResolverRegistry;
//! use chanresolve::serializer::Serializer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ResolverRegistry::default();
//!     let serializer = Serializer::new("channel");
//!     let resolver = registry
//!         .create_resolver("example.com:443", serializer)
//!         .unwrap();
//!
//!     let result = resolver.next().await.unwrap();
//!     for addr in result.socket_addrs() {
//!         println!("{addr}");
//!     }
//!     resolver.orphan();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions and lifecycle state
//! - [`serializer`] - Single-consumer task queue all resolver work runs on
//! - [`resolver`] - The resolver contract, handles, targets and registry
//! - [`lookup`] - Host lookup backends (hickory-dns, system, overrides)
//! - [`dns`] - Pull-based DNS resolver
//! - [`push`] - Push-based resolver and in-memory naming service
//! - [`sockaddr`] - Static `ipv4:` / `ipv6:` address lists

pub mod base;
pub mod dns;
pub mod lookup;
pub mod push;
pub mod resolver;
pub mod serializer;
pub mod sockaddr;

pub use base::neterror::{ErrorKind, NetError};
pub use resolver::{OrphanablePtr, ResolutionResult, Resolver, ResolverRef, ResolverRegistry};
pub use serializer::Serializer;
