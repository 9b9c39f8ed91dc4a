use super::{NamingService, Subscription};
use crate::base::neterror::NetError;
use crate::resolver::ResolutionResult;
use dashmap::DashMap;
use std::fmt;
use tokio::sync::watch;

/// In-memory naming service.
///
/// `publish` pushes a snapshot to every subscriber of a name; `withdraw`
/// drops the name and ends its subscriptions.
#[derive(Default)]
pub struct Directory {
    entries: DashMap<String, watch::Sender<Option<ResolutionResult>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `result` for `name`, returning how many subscribers saw it.
    pub fn publish(&self, name: &str, result: ResolutionResult) -> usize {
        let sender = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| watch::channel(None).0);
        sender.send_replace(Some(result));
        sender.receiver_count()
    }

    /// Removes `name`; its subscribers see the subscription close.
    pub fn withdraw(&self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn current(&self, name: &str) -> Option<ResolutionResult> {
        self.entries.get(name).and_then(|sender| sender.borrow().clone())
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        self.entries.get(name).map(|sender| sender.receiver_count()).unwrap_or(0)
    }
}

impl NamingService for Directory {
    fn subscribe(&self, name: &str) -> Result<Subscription, NetError> {
        let sender = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| watch::channel(None).0);
        Ok(sender.subscribe())
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory").field("names", &self.entries.len()).finish()
    }
}
