//! Explicit subscriber lists.
//!
//! Subscribing returns a [`SubscriptionId`] and a channel receiver; the
//! subscriber stays registered until it calls
//! [`unsubscribe`](Subscribers::unsubscribe) or drops its receiver, in which
//! case the next publish prunes it.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use tracing::trace;

use crate::Realm;

/// Handle returned by [`Subscribers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A list of channel subscribers for events of type `E`.
pub struct Subscribers<E> {
    next_id: AtomicU64,
    senders: Mutex<Vec<(SubscriptionId, Sender<E>)>>,
}

impl<E: Clone> Subscribers<E> {
    /// An empty list.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> (SubscriptionId, Receiver<E>) {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = unbounded();
        self.senders.lock().push((id, tx));
        (id, rx)
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut senders = self.senders.lock();
        let before = senders.len();
        senders.retain(|(sid, _)| *sid != id);
        senders.len() != before
    }

    /// Send `event` to every subscriber, pruning those whose receiver is gone.
    pub fn publish(&self, event: E) {
        let mut senders = self.senders.lock();
        senders.retain(|(id, tx)| {
            let alive = tx.send(event.clone()).is_ok();
            if !alive {
                trace!(subscription = id.0, "pruning disconnected subscriber");
            }
            alive
        });
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.senders.lock().len()
    }

    /// Returns `true` if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Clone> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection lifecycle events published by a
/// [`ConnectionPool`](crate::ConnectionPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A handler connected for the first time.
    Connected(Realm),
    /// A dropped session was re-established.
    Reconnected(Realm),
    /// A handler was closed explicitly or at shutdown.
    Closed(Realm),
    /// An idle handler was evicted by pruning.
    Evicted(Realm),
}

impl ConnectionEvent {
    /// The realm the event concerns.
    pub fn realm(&self) -> &Realm {
        match self {
            ConnectionEvent::Connected(realm)
            | ConnectionEvent::Reconnected(realm)
            | ConnectionEvent::Closed(realm)
            | ConnectionEvent::Evicted(realm) => realm,
        }
    }
}
