//! Cross-context message bus seam
//!
//! Channels are named, ephemeral, one-to-many paths used to relay a callback
//! URL between browsing contexts. Delivery is at-most-once and
//! fire-and-forget: a subscription fires one message then closes, and
//! publishing to a channel with no live subscriber silently drops the
//! payload. There is no acknowledgment.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Receiving half of a one-shot channel subscription
pub struct CallbackReceiver {
    rx: oneshot::Receiver<String>,
}

impl CallbackReceiver {
    /// Wrap the receiving half of a subscription. Bus implementations hand
    /// the sender to their transport and return this to the subscriber.
    pub fn new(rx: oneshot::Receiver<String>) -> Self {
        Self { rx }
    }

    /// Wait for the single message. Returns `None` if the subscription was
    /// closed (unsubscribed or replaced) before anything was published.
    pub async fn recv(self) -> Option<String> {
        self.rx.await.ok()
    }
}

/// Named pub/sub transport between browsing contexts.
///
/// Platform integrations back this with whatever broadcast primitive the
/// host offers; [`LocalBus`] is the in-process implementation.
pub trait MessageBus: Send + Sync {
    /// Open a one-shot listener on `channel`. A second subscription to the
    /// same name replaces the first, closing it.
    fn subscribe(&self, channel: &str) -> CallbackReceiver;

    /// Send `payload` to the channel's subscriber, if any, consuming the
    /// subscription. No subscriber means the message is dropped.
    fn publish(&self, channel: &str, payload: &str);

    /// Close the channel's subscription without delivering anything.
    fn unsubscribe(&self, channel: &str);
}

/// In-process bus backed by oneshot channels
#[derive(Default)]
pub struct LocalBus {
    listeners: Mutex<HashMap<String, oneshot::Sender<String>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open subscriptions (for diagnostics and tests)
    pub fn open_subscriptions(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl MessageBus for LocalBus {
    fn subscribe(&self, channel: &str) -> CallbackReceiver {
        let (tx, rx) = oneshot::channel();
        if self
            .listeners
            .lock()
            .insert(channel.to_string(), tx)
            .is_some()
        {
            warn!("Replaced existing subscription on channel {}", channel);
        }
        CallbackReceiver::new(rx)
    }

    fn publish(&self, channel: &str, payload: &str) {
        let sender = self.listeners.lock().remove(channel);
        match sender {
            Some(tx) => {
                // Receiver may have been dropped; at-most-once either way.
                let _ = tx.send(payload.to_string());
            }
            None => debug!("No subscriber on channel {}, dropping message", channel),
        }
    }

    fn unsubscribe(&self, channel: &str) {
        self.listeners.lock().remove(channel);
    }
}
