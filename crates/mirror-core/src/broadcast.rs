//! Per-observer push loop.
//!
//! One [`BroadcastLoop`] runs per connected observer, on its own task.
//! It registers the observer, then until disconnect:
//!
//! - forwards lifecycle events the registry queued for it, and
//! - every broadcast interval emits the tick events from
//!   [`Monitor::tick_events`] (detection snapshot first when a session is
//!   active, then metrics).
//!
//! The loop ends when the transport's close future resolves, when a send
//! fails, or when the registry has dropped the observer. The observer is
//! unregistered on the way out in every case.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mirror_types::{ObserverId, ServerEvent};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::monitor::Monitor;

/// A transport-level send failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport send failed: {0}")]
pub struct SinkError(pub String);

/// The sending half of an observer's transport.
pub trait EventSink: Send {
    /// Write one event to the transport.
    ///
    /// May suspend on backpressure. An error ends the observer's loop.
    fn send(&mut self, event: &ServerEvent) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Why a broadcast loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// The transport reported closure.
    TransportClosed,
    /// Writing to the transport failed.
    SendFailed,
    /// The registry dropped the observer.
    Dropped,
}

/// Push loop for a single observer.
pub struct BroadcastLoop {
    monitor: Arc<Monitor>,
    period: Duration,
}

impl BroadcastLoop {
    /// Create a loop using the monitor's configured interval.
    pub fn new(monitor: Arc<Monitor>) -> Self {
        let period = monitor.broadcast_interval();
        Self { monitor, period }
    }

    /// Override the tick period.
    #[must_use]
    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Register the observer and stream events to `sink` until `closed`
    /// resolves or the transport fails.
    ///
    /// The first tick fires immediately after registration.
    pub async fn run<S, C>(self, mut sink: S, closed: C) -> Disconnect
    where
        S: EventSink,
        C: Future<Output = ()> + Send,
    {
        let registry = self.monitor.registry();
        let (id, mut inbox) = registry.register_channel().await;
        debug!(observer = %id, period_ms = self.period.as_millis(), "observer connected");

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(closed);

        let reason = loop {
            tokio::select! {
                biased;

                () = &mut closed => break Disconnect::TransportClosed,

                queued = inbox.recv() => {
                    let Some(event) = queued else {
                        break Disconnect::Dropped;
                    };
                    if let Err(e) = sink.send(&event).await {
                        debug!(observer = %id, kind = event.kind(), error = %e, "send failed");
                        break Disconnect::SendFailed;
                    }
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.emit_tick(id, &mut sink).await {
                        debug!(observer = %id, error = %e, "tick send failed");
                        break Disconnect::SendFailed;
                    }
                }
            }
        };

        registry.unregister(id).await;
        debug!(observer = %id, ?reason, "observer disconnected");
        reason
    }

    async fn emit_tick<S: EventSink>(&self, id: ObserverId, sink: &mut S) -> Result<(), SinkError> {
        for event in self.monitor.tick_events().await {
            sink.send(&event).await?;
        }
        debug!(observer = %id, "tick sent");
        Ok(())
    }
}
