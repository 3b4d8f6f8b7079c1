//! Listener fan-out for SDK-emitted events.
//!
//! Each call to [`Listeners::subscribe`] registers one listener and returns
//! the [`EventStream`] that receives its events. The stream is the disposer:
//! dropping it (or calling [`EventStream::dispose`]) removes exactly that
//! listener and leaves every other consumer of the same handle untouched.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Registry of live listeners for one event source.
pub struct Listeners<T> {
    senders: Mutex<Vec<mpsc::UnboundedSender<T>>>,
}

impl<T: Clone> Listeners<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener.
    pub fn subscribe(&self) -> EventStream<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        EventStream { receiver }
    }

    /// Deliver an event to every live listener, pruning disposed ones.
    ///
    /// Events are delivered in emission order per listener.
    pub fn emit(&self, event: &T) {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    /// Number of listeners that have not been disposed.
    pub fn len(&self) -> usize {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.retain(|sender| !sender.is_closed());
        senders.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every listener; their streams end after draining.
    pub fn close(&self) {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<T: Clone> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}

/// One listener's view of an event source.
pub struct EventStream<T> {
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> EventStream<T> {
    /// Receive the next event; `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Remove this listener from its source.
    pub fn dispose(self) {}
}

impl<T> fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_every_listener_in_order() {
        let listeners = Listeners::new();
        let mut a = listeners.subscribe();
        let mut b = listeners.subscribe();

        listeners.emit(&1);
        listeners.emit(&2);

        assert_eq!(a.recv().await, Some(1));
        assert_eq!(a.recv().await, Some(2));
        assert_eq!(b.recv().await, Some(1));
        assert_eq!(b.recv().await, Some(2));
    }

    #[tokio::test]
    async fn test_dispose_removes_only_that_listener() {
        let listeners = Listeners::new();
        let first = listeners.subscribe();
        let mut second = listeners.subscribe();
        assert_eq!(listeners.len(), 2);

        first.dispose();
        assert_eq!(listeners.len(), 1);

        listeners.emit(&"still here");
        assert_eq!(second.recv().await, Some("still here"));
    }

    #[tokio::test]
    async fn test_drop_prunes_on_emit() {
        let listeners = Listeners::new();
        {
            let _scoped = listeners.subscribe();
        }
        listeners.emit(&0u8);
        assert!(listeners.is_empty());
    }

    #[tokio::test]
    async fn test_close_ends_streams() {
        let listeners: Listeners<u8> = Listeners::new();
        let mut stream = listeners.subscribe();
        listeners.close();
        assert_eq!(stream.recv().await, None);
    }
}
