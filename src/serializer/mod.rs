//! Serializer: ordered, mutually exclusive execution of resolver work.
//!
//! A [`Serializer`] is a cloneable handle to one worker task draining an
//! unbounded queue of closures. Every closure scheduled on the same
//! serializer runs to completion before the next one starts, in scheduling
//! order, no matter which thread scheduled it. Resolver state is only ever
//! touched from inside these closures, so backends need no locking of their
//! own.
//!
//! # Example
//!
//! ```rust,ignore
//! use chanresolve::serializer::Serializer;
//!
//! let serializer = Serializer::new("channel-1");
//! let s = serializer.clone();
//! serializer.run(move || assert!(s.is_current()))?;
//! serializer.flush().await?;
//! ```

use crate::base::neterror::NetError;
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

/// A unit of work executed on the serializer.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

static NEXT_SERIALIZER_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    static CURRENT_SERIALIZER: u64;
}

/// Handle to a single-consumer task queue.
///
/// Cloning the handle does not create a new queue. The worker exits once
/// every handle is dropped and the queue is drained.
#[derive(Clone)]
pub struct Serializer {
    id: u64,
    name: Arc<str>,
    sender: mpsc::UnboundedSender<Task>,
    runtime: Handle,
}

impl Serializer {
    /// Creates a serializer whose worker runs on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_handle(name, &Handle::current())
    }

    /// Creates a serializer whose worker runs on `handle`.
    pub fn with_handle(name: impl Into<Arc<str>>, handle: &Handle) -> Self {
        let id = NEXT_SERIALIZER_ID.fetch_add(1, Ordering::Relaxed);
        let name = name.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        handle.spawn(drain(id, Arc::clone(&name), receiver));
        tracing::debug!(serializer = %name, id, "serializer started");
        Self { id, name, sender, runtime: handle.clone() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schedules `task` after everything already queued.
    ///
    /// Never runs `task` inline, even when called from inside the serializer.
    pub fn run<F>(&self, task: F) -> Result<(), NetError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender.send(Box::new(task)).map_err(|_| {
            tracing::warn!(serializer = %self.name, "task scheduled on a closed serializer");
            NetError::SerializerClosed
        })
    }

    /// Returns true when the caller is executing a task of this serializer.
    pub fn is_current(&self) -> bool {
        CURRENT_SERIALIZER.try_with(|id| *id == self.id).unwrap_or(false)
    }

    /// Spawns background work (lookups, timers) on the serializer's runtime.
    ///
    /// The future runs off the serializer; it reports back by scheduling a
    /// task with [`run`](Self::run).
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Waits until every task scheduled before this call has run.
    pub async fn flush(&self) -> Result<(), NetError> {
        let (tx, rx) = oneshot::channel();
        self.run(move || {
            let _ = tx.send(());
        })?;
        rx.await.map_err(|_| NetError::SerializerClosed)
    }
}

impl PartialEq for Serializer {
    fn eq(&self, other: &Self) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

impl Eq for Serializer {}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

async fn drain(id: u64, name: Arc<str>, mut receiver: mpsc::UnboundedReceiver<Task>) {
    CURRENT_SERIALIZER
        .scope(id, async move {
            while let Some(task) = receiver.recv().await {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_string());
                    tracing::error!(serializer = %name, panic = %message, "serializer task panicked");
                }
            }
            tracing::debug!(serializer = %name, "serializer worker exiting");
        })
        .await
}
