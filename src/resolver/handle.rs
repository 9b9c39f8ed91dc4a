//! Reference-counted resolver handles and the orphan protocol.
//!
//! A resolver lives in a shared cell next to its serializer, its lifecycle
//! flag and its pending-delivery flag. Three handle types point at the cell:
//!
//! - [`ResolverRef`]: a counted reference. Clone is AddRef, drop is ReleaseRef.
//! - [`OrphanablePtr`]: the owner's reference, plus the one right to orphan.
//! - [`LockedHandle`]: a weak reference backends keep to marshal their own
//!   completions back onto the serializer.
//!
//! Orphaning moves the resolver `Active → ShuttingDown`, and schedules a
//! serializer task that owns the "active" reference. That task runs
//! `shutdown_locked`, marks the resolver `ShutDown` and releases the
//! reference. The cell is freed when the last reference goes away; if that
//! happens before shutdown completed, teardown runs the shutdown itself.

use crate::base::lifecycle::Lifecycle;
use crate::base::neterror::NetError;
use crate::resolver::delivery::{NextResult, OnComplete, PendingDelivery};
use crate::resolver::Resolver;
use crate::serializer::Serializer;
use parking_lot::{Mutex, MutexGuard};
use std::{
    fmt,
    future::Future,
    ops::Deref,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc, Weak,
    },
    task::{Context, Poll},
};
use tokio::sync::oneshot;

struct Inner<R: ?Sized + Resolver> {
    serializer: Serializer,
    name: Arc<str>,
    lifecycle: AtomicU8,
    pending: Arc<AtomicBool>,
    // Only locked from serializer tasks, so never contended.
    resolver: Mutex<R>,
}

impl<R: ?Sized + Resolver> Inner<R> {
    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }
}

impl<R: ?Sized + Resolver> Drop for Inner<R> {
    fn drop(&mut self) {
        if Lifecycle::from_u8(*self.lifecycle.get_mut()) != Lifecycle::ShutDown {
            tracing::error!(
                resolver = %self.name,
                "resolver released before shutdown completed; shutting down during teardown"
            );
            self.resolver.get_mut().shutdown_locked();
            *self.lifecycle.get_mut() = Lifecycle::ShutDown.as_u8();
        }
        tracing::debug!(resolver = %self.name, "resolver destroyed");
    }
}

/// A counted reference to a resolver.
pub struct ResolverRef<R: ?Sized + Resolver = dyn Resolver> {
    inner: Arc<Inner<R>>,
}

impl<R: Resolver> ResolverRef<R> {
    /// Creates a resolver bound to `serializer`, holding one reference.
    ///
    /// `build` receives the [`LockedHandle`] the backend uses to schedule
    /// work on itself. The handle cannot reach the resolver until `build`
    /// returns.
    pub fn new_cyclic<F>(serializer: Serializer, name: impl Into<Arc<str>>, build: F) -> Self
    where
        F: FnOnce(LockedHandle<R>) -> R,
    {
        let name = name.into();
        let inner = Arc::new_cyclic(|weak: &Weak<Inner<R>>| {
            let handle = LockedHandle { serializer: serializer.clone(), inner: weak.clone() };
            Inner {
                serializer,
                name: Arc::clone(&name),
                lifecycle: AtomicU8::new(Lifecycle::Active.as_u8()),
                pending: Arc::new(AtomicBool::new(false)),
                resolver: Mutex::new(build(handle)),
            }
        });
        tracing::debug!(resolver = %name, "resolver created");
        Self { inner }
    }

    pub fn new(serializer: Serializer, name: impl Into<Arc<str>>, resolver: R) -> Self {
        Self::new_cyclic(serializer, name, |_| resolver)
    }

    /// Erases the backend type.
    pub fn into_dyn(self) -> ResolverRef {
        let inner: Arc<Inner<dyn Resolver>> = Arc::<Inner<R>>::clone(&self.inner);
        drop(self);
        ResolverRef { inner }
    }
}

impl<R: ?Sized + Resolver> ResolverRef<R> {
    /// Hands this reference to an owner that will orphan the resolver.
    pub fn into_orphanable(self) -> OrphanablePtr<R> {
        OrphanablePtr { resolver: self }
    }

    pub fn serializer(&self) -> &Serializer {
        &self.inner.serializer
    }

    /// The target this resolver was created for, for diagnostics.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> Lifecycle {
        self.inner.lifecycle()
    }

    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn has_pending_next(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> Result<MutexGuard<'_, R>, NetError> {
        if !self.inner.serializer.is_current() {
            tracing::warn!(resolver = %self.inner.name, "locked call outside the serializer");
            return Err(NetError::NotOnSerializer);
        }
        self.inner.resolver.try_lock().ok_or_else(|| {
            tracing::warn!(resolver = %self.inner.name, "locked call re-entered the resolver");
            NetError::ReentrantLockedCall
        })
    }

    /// Asks for the next result. Must run on the serializer.
    ///
    /// `on_complete` runs on the serializer once the backend has a new result
    /// (`Ok`) or is broken (`Err`). A request made while another is pending
    /// is rejected with [`NetError::NextAlreadyPending`] and its callback is
    /// dropped uncalled.
    pub fn next_locked<F>(&self, on_complete: F) -> Result<(), NetError>
    where
        F: FnOnce(NextResult) + Send + 'static,
    {
        self.try_next_locked(Box::new(on_complete)).map_err(|(error, _)| error)
    }

    fn try_next_locked(&self, on_complete: OnComplete) -> Result<(), (NetError, OnComplete)> {
        let mut resolver = match self.lock() {
            Ok(resolver) => resolver,
            Err(e) => return Err((e, on_complete)),
        };
        if self.inner.pending.swap(true, Ordering::AcqRel) {
            tracing::warn!(resolver = %self.inner.name, "next requested while a delivery is pending");
            return Err((NetError::NextAlreadyPending, on_complete));
        }

        let delivery = PendingDelivery::new(
            self.inner.serializer.clone(),
            Arc::clone(&self.inner.pending),
            on_complete,
        );
        if self.inner.lifecycle() == Lifecycle::ShutDown {
            drop(resolver);
            delivery.fail(NetError::ResolverShutdown);
            return Ok(());
        }
        tracing::trace!(resolver = %self.inner.name, "next requested");
        resolver.next_locked(delivery);
        Ok(())
    }

    /// Hints that the current data may be stale. Must run on the serializer.
    ///
    /// A no-op once the resolver has shut down.
    pub fn request_reresolution_locked(&self) -> Result<(), NetError> {
        let mut resolver = self.lock()?;
        if self.inner.lifecycle() == Lifecycle::ShutDown {
            return Ok(());
        }
        tracing::debug!(resolver = %self.inner.name, "re-resolution requested");
        resolver.request_reresolution_locked();
        Ok(())
    }

    /// Schedules [`next_locked`](Self::next_locked) from any context.
    pub fn next(&self) -> NextJob {
        let (sender, receiver) = oneshot::channel();
        let this = self.clone();
        let scheduled = self.inner.serializer.run(move || {
            let on_complete: OnComplete = Box::new(move |result| {
                let _ = sender.send(result);
            });
            if let Err((error, on_complete)) = this.try_next_locked(on_complete) {
                on_complete(Err(error));
            }
        });
        if let Err(e) = scheduled {
            tracing::debug!(resolver = %self.inner.name, error = %e, "next not scheduled");
        }
        NextJob { receiver }
    }

    /// Schedules [`request_reresolution_locked`](Self::request_reresolution_locked)
    /// from any context.
    pub fn request_reresolution(&self) -> Result<(), NetError> {
        let this = self.clone();
        self.inner.serializer.run(move || {
            if let Err(e) = this.request_reresolution_locked() {
                tracing::warn!(resolver = %this.inner.name, error = %e, "re-resolution failed");
            }
        })
    }

    fn orphan(&self) {
        let swapped = self.inner.lifecycle.compare_exchange(
            Lifecycle::Active.as_u8(),
            Lifecycle::ShuttingDown.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if swapped.is_err() {
            tracing::warn!(resolver = %self.inner.name, "resolver orphaned twice; ignoring");
            return;
        }
        tracing::debug!(
            resolver = %self.inner.name,
            refs = self.ref_count(),
            "resolver orphaned; scheduling shutdown"
        );

        let active = self.clone();
        if self.inner.serializer.run(move || active.shutdown_and_unref_locked()).is_err() {
            tracing::warn!(
                resolver = %self.inner.name,
                "serializer closed; shutdown deferred to teardown"
            );
        }
    }

    fn shutdown_and_unref_locked(self) {
        self.inner.resolver.lock().shutdown_locked();
        self.inner.lifecycle.store(Lifecycle::ShutDown.as_u8(), Ordering::Release);
        tracing::debug!(
            resolver = %self.inner.name,
            refs = self.ref_count() - 1,
            "resolver shut down; releasing active reference"
        );
    }
}

impl<R: ?Sized + Resolver> Clone for ResolverRef<R> {
    fn clone(&self) -> Self {
        let inner = Arc::clone(&self.inner);
        tracing::trace!(resolver = %inner.name, refs = Arc::strong_count(&inner), "resolver ref");
        Self { inner }
    }
}

impl<R: ?Sized + Resolver> Drop for ResolverRef<R> {
    fn drop(&mut self) {
        tracing::trace!(
            resolver = %self.inner.name,
            refs = Arc::strong_count(&self.inner) - 1,
            "resolver unref"
        );
    }
}

impl<R: ?Sized + Resolver> fmt::Debug for ResolverRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRef")
            .field("name", &self.inner.name)
            .field("state", &self.inner.lifecycle())
            .field("refs", &Arc::strong_count(&self.inner))
            .finish_non_exhaustive()
    }
}

/// The owner's handle: one reference plus the right to orphan.
///
/// Dropping it orphans the resolver; [`orphan`](Self::orphan) does the same
/// explicitly. Either way the orphan runs once.
pub struct OrphanablePtr<R: ?Sized + Resolver = dyn Resolver> {
    resolver: ResolverRef<R>,
}

impl<R: ?Sized + Resolver> OrphanablePtr<R> {
    /// Relinquishes ownership and starts the asynchronous shutdown.
    pub fn orphan(self) {
        drop(self);
    }

    /// Takes an additional counted reference.
    pub fn add_ref(&self) -> ResolverRef<R> {
        self.resolver.clone()
    }
}

impl<R: ?Sized + Resolver> Deref for OrphanablePtr<R> {
    type Target = ResolverRef<R>;

    fn deref(&self) -> &Self::Target {
        &self.resolver
    }
}

impl<R: ?Sized + Resolver> Drop for OrphanablePtr<R> {
    fn drop(&mut self) {
        self.resolver.orphan();
    }
}

impl<R: ?Sized + Resolver> fmt::Debug for OrphanablePtr<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OrphanablePtr").field(&self.resolver).finish()
    }
}

/// Weak handle a backend keeps to run code on itself inside the serializer.
///
/// Work scheduled after the resolver shut down, or was destroyed, is
/// discarded.
pub struct LockedHandle<R: ?Sized + Resolver> {
    serializer: Serializer,
    inner: Weak<Inner<R>>,
}

impl<R: ?Sized + Resolver> LockedHandle<R> {
    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Schedules `f` with exclusive access to the resolver.
    pub fn run_locked<F>(&self, f: F) -> Result<(), NetError>
    where
        F: FnOnce(&mut R) + Send + 'static,
    {
        let inner = self.inner.clone();
        self.serializer.run(move || {
            let Some(inner) = inner.upgrade() else {
                tracing::trace!("resolver destroyed; dropping locked task");
                return;
            };
            if inner.lifecycle() == Lifecycle::ShutDown {
                tracing::trace!(resolver = %inner.name, "resolver shut down; dropping locked task");
                return;
            }
            let Some(mut resolver) = inner.resolver.try_lock() else {
                tracing::warn!(resolver = %inner.name, "resolver busy; dropping locked task");
                return;
            };
            f(&mut *resolver);
        })
    }
}

impl<R: ?Sized + Resolver> Clone for LockedHandle<R> {
    fn clone(&self) -> Self {
        Self { serializer: self.serializer.clone(), inner: self.inner.clone() }
    }
}

impl<R: ?Sized + Resolver> fmt::Debug for LockedHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedHandle")
            .field("serializer", &self.serializer.name())
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Future for a delivery requested with [`ResolverRef::next`].
#[must_use = "a NextJob does nothing unless awaited"]
pub struct NextJob {
    receiver: oneshot::Receiver<NextResult>,
}

impl NextJob {
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<NextResult> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(NetError::SerializerClosed)),
        }
    }
}

impl Future for NextJob {
    type Output = NextResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().poll_recv(cx)
    }
}
