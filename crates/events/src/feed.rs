//! The bounded fan-out primitive behind every event feed.

use tokio::sync::broadcast;
use tracing::warn;

/// Default per-subscriber queue depth.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// A typed event feed. Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct Feed<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Feed<T> {
    /// Feed with the default queue depth.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Feed whose subscribers may lag up to `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers. Never blocks;
    /// returns the number of subscribers that will observe it.
    pub fn send(&self, event: T) -> usize {
        // an error only means nobody is listening
        self.tx.send(event).unwrap_or(0)
    }

    /// Open a new subscription receiving events published after this
    /// call.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Send + 'static> Default for Feed<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of a feed.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: broadcast::Receiver<T>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    /// Wait for the next event. Returns `None` once the feed is gone or
    /// this subscriber lagged past the queue depth and was dropped.
    pub async fn recv(&mut self) -> Option<T> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Closed) => None,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "event subscriber too slow, dropping subscription");
                None
            }
        }
    }

    /// Non-blocking poll for the next event.
    pub fn try_recv(&mut self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                warn!(missed, "event subscriber too slow, dropping subscription");
                None
            }
            Err(_) => None,
        }
    }

    /// Drain everything currently queued.
    pub fn drain(&mut self) -> Vec<T> {
        let mut out = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            out.push(event);
        }
        out
    }
}
