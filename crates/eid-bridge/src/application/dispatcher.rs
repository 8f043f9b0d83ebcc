//! Fan-out of decoded SDK messages to subscribers.
//!
//! The dispatcher is the only boundary between the protocol core and its
//! consumers (UI layers, the CLI authentication flow, tests).  It is an
//! explicit object owned by the application, not ambient global pub/sub.
//!
//! # Delivery rules
//!
//! - [`EventDispatcher::publish`] calls every handler synchronously, in
//!   subscription order, exactly once per event.
//! - The handler list is snapshotted when a publish begins.  A handler added
//!   during that publish is not called for it; a handler removed during it
//!   still is.
//! - Nothing is buffered.  An event published while nobody is subscribed is
//!   gone.
//!
//! - A handler that panics is logged and skipped.  The remaining handlers
//!   still receive the event, and later publishes are unaffected.
//!
//! Handlers run without the internal lock held, so they may subscribe,
//! unsubscribe, or publish again without deadlocking.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use eid_core::DecodedEvent;
use tokio::sync::mpsc;
use tracing::error;

/// A subscriber callback.
pub type EventHandler = Arc<dyn Fn(&DecodedEvent) + Send + Sync>;

/// Opaque handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

/// Synchronous, ordered event fan-out.
pub struct EventDispatcher {
    /// Subscribers in subscription order.
    subscribers: Mutex<Vec<(SubscriptionToken, EventHandler)>>,
    next_token: AtomicU64,
}

impl EventDispatcher {
    /// Creates a dispatcher with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(0),
        }
    }

    /// Registers `handler` and returns its token.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionToken
    where
        F: Fn(&DecodedEvent) + Send + Sync + 'static,
    {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.lock().push((token, Arc::new(handler)));
        token
    }

    /// Registers a subscriber that forwards a copy of every event into a
    /// channel, for consumers living in async tasks.
    ///
    /// Dropping the receiver does not unsubscribe; call
    /// [`unsubscribe`](Self::unsubscribe) with the returned token.
    pub fn subscribe_channel(&self) -> (SubscriptionToken, mpsc::UnboundedReceiver<DecodedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = self.subscribe(move |event| {
            // A closed receiver just means the consumer went away.
            let _ = tx.send(event.clone());
        });
        (token, rx)
    }

    /// Removes the subscriber registered under `token`.
    ///
    /// Returns `false` if the token was unknown (already removed).
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(t, _)| *t != token);
        subscribers.len() != before
    }

    /// Delivers `event` to every current subscriber, in order.
    ///
    /// Returns the number of handlers called.
    pub fn publish(&self, event: &DecodedEvent) -> usize {
        let snapshot: Vec<EventHandler> = self
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in &snapshot {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                error!(
                    kind = %event.kind,
                    "event subscriber panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
        snapshot.len()
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// A panicking handler never runs under this lock, so a poisoned lock
    /// still guards a consistent list.
    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionToken, EventHandler)>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
