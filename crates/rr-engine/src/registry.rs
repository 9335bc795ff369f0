//! Handle registry: the authoritative map of in-flight launches
//!
//! Owns each handle from allocation until its single terminal resolution.
//! Every code path that can complete a handle (callback message, timeout,
//! manual cancel, user-closed surface, launch failure) funnels through
//! [`HandleRegistry::resolve`], which takes the caller's result sender out
//! of the entry under one write-lock section. The first resolver wins; later
//! attempts find the handle gone and become no-ops.

use crate::types::{HandleId, LaunchResult, Scope};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// In-flight handle state
struct HandleEntry {
    channel_name: String,
    scope: Scope,
    result_tx: oneshot::Sender<LaunchResult>,
}

/// Resources a resolved handle held, returned to the resolver for cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedHandle {
    pub channel_name: String,
    pub scope: Scope,
}

#[derive(Default)]
pub struct HandleRegistry {
    handles: RwLock<HashMap<HandleId, HandleEntry>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle: a fresh nonce, its delivery channel name, and the
    /// receiver the caller awaits for the terminal result.
    ///
    /// The channel name is the explicit one if given, otherwise derived from
    /// the nonce so it is unique to this handle.
    pub fn allocate(
        &self,
        explicit_channel: Option<&str>,
        scope: Scope,
    ) -> (HandleId, String, oneshot::Receiver<LaunchResult>) {
        let id = HandleId::new();
        let channel_name = match explicit_channel {
            Some(name) => name.to_string(),
            None => format!("rr-{}", id),
        };

        let (tx, rx) = oneshot::channel();
        let entry = HandleEntry {
            channel_name: channel_name.clone(),
            scope,
            result_tx: tx,
        };
        self.handles.write().insert(id, entry);

        info!("Allocated handle {} on channel {}", id, channel_name);
        (id, channel_name, rx)
    }

    /// Resolve a handle exactly once.
    ///
    /// Returns the handle's released resources on the first call and `None`
    /// on every later call (or for unknown nonces), so concurrent completion
    /// sources cannot double-resolve.
    pub fn resolve(&self, id: HandleId, result: LaunchResult) -> Option<ReleasedHandle> {
        let entry = self.handles.write().remove(&id)?;

        debug!("Resolving handle {} with {:?}", id, result);
        // The caller may have dropped its receiver; the handle still counts
        // as resolved.
        let _ = entry.result_tx.send(result);

        Some(ReleasedHandle {
            channel_name: entry.channel_name,
            scope: entry.scope,
        })
    }

    pub fn is_pending(&self, id: HandleId) -> bool {
        self.handles.read().contains_key(&id)
    }

    /// Nonces of all handles that have not reached a terminal state
    pub fn pending_ids(&self) -> Vec<HandleId> {
        self.handles.read().keys().copied().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.handles.read().len()
    }
}
