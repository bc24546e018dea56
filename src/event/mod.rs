//! Event system for observing pump activity.
//!
//! The driver never prints. Every exchange and state change is published as an
//! [`Event`] so that callers can present progress however they like.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::protocol::{Frame, ResponseOutcome};
use crate::types::ErrorCode;

/// Event types that can be dispatched.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Transport connected.
    Connected,
    /// Transport disconnected.
    Disconnected,
    /// A frame was written to the pump.
    FrameSent(Frame),
    /// A reply was received and classified.
    Response {
        /// The raw reply.
        frame: Frame,
        /// Its interpretation.
        outcome: ResponseOutcome,
    },
    /// A write-then-confirm loop observed the requested state.
    StateConfirmed {
        operation: &'static str,
        attempts: u32,
    },
    /// A confirmation read did not match; the write will be repeated.
    RetryScheduled {
        operation: &'static str,
        attempt: u32,
    },
    /// The pump reported an internal fault.
    DeviceFault(ErrorCode),
    /// The driver forced the pump to idle after a failure.
    ForcedIdle,
    /// Tare command accepted, polling until idle.
    TareStarted,
    /// Tare finished.
    TareFinished,
    /// Holding the current control action for the given time.
    HoldStarted(Duration),
    /// Hold elapsed.
    HoldFinished,
}

/// A subscription to events.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receives the next event.
    ///
    /// Returns `None` once the dispatcher is dropped.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next already-dispatched event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }

    /// Drains every event dispatched so far.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

struct EventDispatcherInner {
    sender: broadcast::Sender<Event>,
}

/// Dispatches events to subscribers.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<EventDispatcherInner>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher buffering up to `capacity` events per
    /// subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(EventDispatcherInner { sender }),
        }
    }

    /// Dispatches an event to all subscribers.
    pub fn dispatch(&self, event: Event) {
        // no subscribers is fine
        let _ = self.inner.sender.send(event);
    }

    /// Subscribes to events dispatched from now on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.inner.sender.subscribe(),
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(256)
    }
}
