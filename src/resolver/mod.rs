//! The resolver contract.
//!
//! A [`Resolver`] turns a target name into a stream of
//! [`ResolutionResult`] snapshots for a client channel. Pull-based backends
//! (DNS) have to query again to learn about changes; push-based backends
//! (naming-service subscriptions) are told. Both sit behind the same three
//! methods, all of which run on the resolver's [`Serializer`](crate::serializer::Serializer):
//!
//! - `next_locked`: the channel almost always has one of these pending. When
//!   it fires, the channel consumes the result and immediately asks again,
//!   which lets push backends stream updates through a pull-shaped API.
//! - `request_reresolution_locked`: a hint that the data may be stale.
//! - `shutdown_locked`: release everything, fail whatever is pending.
//!
//! Backends are never called directly; the owner goes through
//! [`ResolverRef`] and [`OrphanablePtr`], which enforce the calling rules.

mod delivery;
mod handle;
mod registry;
mod result;
mod target;

pub use delivery::{NextResult, OnComplete, PendingDelivery};
pub use handle::{LockedHandle, NextJob, OrphanablePtr, ResolverRef};
pub use registry::{RegistryConfig, ResolverArgs, ResolverFactory, ResolverRegistry};
pub use result::{ResolutionResult, ResolutionResultBuilder, ServerAddress};
pub use target::Target;

/// A name-resolution backend.
///
/// Every method runs on the serializer the resolver was created with, so
/// implementations keep their state in plain fields.
pub trait Resolver: Send + 'static {
    /// Takes the single pending delivery.
    ///
    /// Complete it right away if a result is ready, otherwise keep it until
    /// one is. If resolution is broken for good, fail it; the owner may ask
    /// again afterwards and the backend is free to keep failing.
    fn next_locked(&mut self, delivery: PendingDelivery);

    /// Asks for fresher data.
    ///
    /// The backend may delay the actual query (minimum interval between
    /// lookups), but the pending or next delivery must complete shortly
    /// after this call: with new data, or with a fresh copy of the last
    /// result. Push backends re-deliver what they last saw.
    //
    // The prompt re-delivery only exists because a pick-first policy throws
    // away unselected subchannels and waits on the resolver to hand the same
    // list back; it can be relaxed once that policy keeps them.
    fn request_reresolution_locked(&mut self);

    /// Releases timers, lookups and subscriptions, and fails any pending
    /// delivery with [`NetError::ResolverShutdown`](crate::base::neterror::NetError::ResolverShutdown).
    ///
    /// Called exactly once, by the orphan protocol.
    fn shutdown_locked(&mut self);
}
