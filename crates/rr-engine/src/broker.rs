//! Channel broker: persisted channel registry plus pub/sub
//!
//! The broker keeps a shared registry of channel names per scope so that a
//! callback page loaded in a different browsing context can discover which
//! channels to notify, and fronts the message bus for the actual delivery.
//! The registry is one JSON-encoded string list per scope key; readers treat
//! a missing or malformed list as empty.

use crate::bus::{CallbackReceiver, MessageBus};
use crate::storage::KeyValueStore;
use crate::types::Scope;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ChannelBroker {
    store: Arc<dyn KeyValueStore>,
    bus: Arc<dyn MessageBus>,
}

impl ChannelBroker {
    pub fn new(store: Arc<dyn KeyValueStore>, bus: Arc<dyn MessageBus>) -> Self {
        Self { store, bus }
    }

    /// Channel names currently registered for `scope`
    pub fn registered(&self, scope: &Scope) -> Vec<String> {
        let key = scope.storage_key();
        let Some(raw) = self.store.get(&key) else {
            return Vec::new();
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(names) => names,
            Err(e) => {
                warn!("Malformed channel registry under {}: {}", key, e);
                Vec::new()
            }
        }
    }

    /// Add `name` to the registry for `scope` if not already present.
    ///
    /// This is an unsynchronized read-union-write against shared storage:
    /// two contexts registering at the same instant can lose one of the two
    /// names. The merge is append-only so a register never drops names it
    /// did observe.
    pub fn register(&self, scope: &Scope, name: &str) {
        let mut names = self.registered(scope);
        if names.iter().any(|n| n == name) {
            return;
        }
        names.push(name.to_string());
        self.write_registry(scope, &names);
        debug!("Registered channel {} under scope {}", name, scope);
    }

    /// Remove `name` from the registry for `scope`
    pub fn unregister(&self, scope: &Scope, name: &str) {
        let mut names = self.registered(scope);
        let before = names.len();
        names.retain(|n| n != name);
        if names.len() != before {
            self.write_registry(scope, &names);
            debug!("Unregistered channel {} from scope {}", name, scope);
        }
    }

    fn write_registry(&self, scope: &Scope, names: &[String]) {
        match serde_json::to_string(names) {
            Ok(json) => self.store.set(&scope.storage_key(), &json),
            Err(e) => warn!("Failed to encode channel registry: {}", e),
        }
    }

    /// Open a one-shot listener on `name`
    pub fn subscribe(&self, name: &str) -> CallbackReceiver {
        self.bus.subscribe(name)
    }

    /// Close the listener on `name` without delivering anything
    pub fn unsubscribe(&self, name: &str) {
        self.bus.unsubscribe(name);
    }

    /// Publish `payload` directly to one channel, registered or not
    pub fn publish_to(&self, name: &str, payload: &str) {
        self.bus.publish(name, payload);
    }

    /// Publish `payload` to every channel registered for `scope`.
    ///
    /// An empty or missing registry is not an error; channels without a live
    /// subscriber silently drop the message. Returns the number of channels
    /// published to.
    pub fn publish_all(&self, scope: &Scope, payload: &str) -> usize {
        let names = self.registered(scope);
        if names.is_empty() {
            debug!("No channels registered for scope {}, nothing to publish", scope);
            return 0;
        }

        for name in &names {
            self.bus.publish(name, payload);
        }
        names.len()
    }
}
