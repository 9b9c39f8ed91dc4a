//! The pending result-delivery request.

use crate::base::neterror::NetError;
use crate::resolver::result::ResolutionResult;
use crate::serializer::Serializer;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// What a completion callback receives: a new snapshot, or the error that
/// stands in for an absent result.
pub type NextResult = Result<ResolutionResult, NetError>;

/// Completion callback for [`ResolverRef::next_locked`](crate::resolver::ResolverRef::next_locked).
pub type OnComplete = Box<dyn FnOnce(NextResult) + Send + 'static>;

/// A delivery request handed to a backend by `next_locked`.
///
/// The backend keeps it until it has something to say, then consumes it with
/// [`deliver`](Self::deliver) or [`fail`](Self::fail). The callback is never
/// invoked inline: it runs as a fresh serializer task, after the current one,
/// so it may immediately issue the next request.
///
/// Dropping an uncompleted delivery fails it with
/// [`NetError::DeliveryAbandoned`].
pub struct PendingDelivery {
    serializer: Serializer,
    pending: Arc<AtomicBool>,
    on_complete: Option<OnComplete>,
}

impl PendingDelivery {
    pub(crate) fn new(serializer: Serializer, pending: Arc<AtomicBool>, on_complete: OnComplete) -> Self {
        Self { serializer, pending, on_complete: Some(on_complete) }
    }

    pub fn deliver(mut self, result: ResolutionResult) {
        self.complete(Ok(result));
    }

    pub fn fail(mut self, error: NetError) {
        self.complete(Err(error));
    }

    fn complete(&mut self, result: NextResult) {
        let Some(on_complete) = self.on_complete.take() else {
            return;
        };
        tracing::trace!(
            serializer = %self.serializer.name(),
            ok = result.is_ok(),
            "scheduling delivery"
        );
        let pending = Arc::clone(&self.pending);
        let scheduled = self.serializer.run(move || {
            pending.store(false, Ordering::Release);
            on_complete(result);
        });
        if scheduled.is_err() {
            // The callback went down with the queue; nobody is left to wait.
            self.pending.store(false, Ordering::Release);
        }
    }
}

impl Drop for PendingDelivery {
    fn drop(&mut self) {
        if self.on_complete.is_some() {
            tracing::warn!(
                serializer = %self.serializer.name(),
                "pending delivery dropped by backend; failing it"
            );
            self.complete(Err(NetError::DeliveryAbandoned));
        }
    }
}

impl fmt::Debug for PendingDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDelivery")
            .field("serializer", &self.serializer.name())
            .field("completed", &self.on_complete.is_none())
            .finish()
    }
}
