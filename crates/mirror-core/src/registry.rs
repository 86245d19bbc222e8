//! Connected observer bookkeeping and best-effort fan-out.
//!
//! The registry never performs transport I/O itself. Each observer is a
//! non-blocking delivery target (normally the inbox of that observer's
//! [`BroadcastLoop`](crate::broadcast::BroadcastLoop)), so a slow
//! connection can only ever hold up its own loop.
//!
//! [`ObserverRegistry::broadcast`] iterates a snapshot of the membership
//! taken under a short read lock. Observers may register or leave while a
//! broadcast is in flight; anything whose delivery fails is removed once
//! the pass is done.

use std::collections::BTreeMap;
use std::sync::Arc;

use mirror_types::{ObserverId, ServerEvent};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

/// Delivery to one observer failed. The observer is dropped.
#[derive(Debug, Clone, thiserror::Error)]
#[error("observer send failed: {reason}")]
pub struct ObserverSendFailure {
    /// What went wrong.
    pub reason: String,
}

/// A delivery target for broadcast events.
///
/// Implementations must not block: queue the event and return.
pub trait Observer: Send + Sync {
    /// Hand one event to the observer.
    fn deliver(&self, event: &Arc<ServerEvent>) -> Result<(), ObserverSendFailure>;
}

/// Observer backed by an unbounded queue drained by a broadcast loop.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<Arc<ServerEvent>>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its queue.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Arc<ServerEvent>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Observer for ChannelObserver {
    fn deliver(&self, event: &Arc<ServerEvent>) -> Result<(), ObserverSendFailure> {
        self.tx
            .send(Arc::clone(event))
            .map_err(|e| ObserverSendFailure {
                reason: e.to_string(),
            })
    }
}

/// The set of currently connected observers.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<BTreeMap<ObserverId, Arc<dyn Observer>>>,
}

impl ObserverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer and return its id.
    pub async fn register(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = ObserverId::new();
        self.observers.write().await.insert(id, observer);
        debug!(observer = %id, "observer registered");
        id
    }

    /// Register a queue-backed observer and return its id plus the queue
    /// the caller must drain.
    pub async fn register_channel(&self) -> (ObserverId, mpsc::UnboundedReceiver<Arc<ServerEvent>>) {
        let (observer, rx) = ChannelObserver::new();
        let id = self.register(Arc::new(observer)).await;
        (id, rx)
    }

    /// Remove an observer. Returns `false` if it was already gone.
    pub async fn unregister(&self, id: ObserverId) -> bool {
        let removed = self.observers.write().await.remove(&id).is_some();
        if removed {
            debug!(observer = %id, "observer unregistered");
        }
        removed
    }

    /// Deliver `event` to every registered observer.
    ///
    /// Observers whose delivery fails are removed. Never fails; returns
    /// how many observers accepted the event.
    pub async fn broadcast(&self, event: ServerEvent) -> usize {
        let targets: Vec<(ObserverId, Arc<dyn Observer>)> = self
            .observers
            .read()
            .await
            .iter()
            .map(|(id, observer)| (*id, Arc::clone(observer)))
            .collect();

        let event = Arc::new(event);
        let mut delivered: usize = 0;
        let mut failed = Vec::new();
        for (id, observer) in targets {
            match observer.deliver(&event) {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(e) => {
                    warn!(observer = %id, kind = event.kind(), error = %e, "dropping observer");
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut observers = self.observers.write().await;
            for id in failed {
                observers.remove(&id);
            }
        }

        debug!(kind = event.kind(), delivered, "broadcast complete");
        delivered
    }

    /// Whether an observer is currently registered.
    pub async fn contains(&self, id: ObserverId) -> bool {
        self.observers.read().await.contains_key(&id)
    }

    /// Number of registered observers.
    pub async fn len(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Whether no observer is registered.
    pub async fn is_empty(&self) -> bool {
        self.observers.read().await.is_empty()
    }
}
